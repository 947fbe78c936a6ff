// SpectrumAnalyzer - harmonic product spectrum pitch estimation
//
// A knock excites the tire's fundamental together with a series of
// harmonics. Multiplying the spectrum by copies of itself downsampled by
// 2..=H lines those harmonics up on the fundamental's bin, so the true
// fundamental outgrows isolated spurious peaks:
//
//   HPS[i] = X[i] * X[2i] * X[3i] * ... * X[Hi]
//
// The peak is then searched only inside the physically plausible knock band
// (60-200 Hz by default) and converted back to Hz.
//
// Input bins are unsigned bytes from a decibel-scaled analyser, so a five-way
// product reaches 255^5 (~1e12); the working spectrum is f64.

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, SpectrumConfig};
use crate::error::AnalysisError;

/// Fundamental picked from one captured spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumResult {
    pub peak_bin: usize,
    pub peak_frequency_hz: f32,
}

pub struct SpectrumAnalyzer {
    sample_rate: u32,
    fft_size: usize,
    harmonics: usize,
    band_min_hz: f32,
    band_max_hz: f32,
    hps: Vec<f64>,
}

impl SpectrumAnalyzer {
    /// # Arguments
    /// * `sample_rate` - Sample rate the spectrum was computed at
    /// * `fft_size` - Analysis window; the spectrum holds `fft_size / 2` bins
    /// * `config` - Harmonic count and search band
    pub fn new(sample_rate: u32, fft_size: usize, config: &SpectrumConfig) -> Self {
        Self {
            sample_rate,
            fft_size,
            harmonics: config.harmonics.max(1),
            band_min_hz: config.band_min_hz,
            band_max_hz: config.band_max_hz,
            hps: vec![0.0; fft_size / 2],
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.audio.sample_rate, config.audio.fft_size, &config.spectrum)
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Centre frequency of `bin`
    pub fn bin_to_hz(&self, bin: usize) -> f32 {
        (bin as f64 * self.sample_rate as f64 / self.fft_size as f64) as f32
    }

    /// Bin index for `freq_hz`, rounded to the nearest bin
    pub fn hz_to_bin(&self, freq_hz: f32) -> usize {
        let nyquist = self.sample_rate as f64 / 2.0;
        let index = (freq_hz as f64 / nyquist * self.bin_count() as f64).round();
        index.max(0.0) as usize
    }

    /// Half-open bin range `[min, max)` covering the search band
    pub fn band_indices(&self) -> (usize, usize) {
        let min = self.hz_to_bin(self.band_min_hz);
        let max = self.hz_to_bin(self.band_max_hz).min(self.bin_count());
        (min, max)
    }

    /// Compute the harmonic product spectrum of `spectrum`
    ///
    /// The returned slice is the analyzer's working buffer and is
    /// overwritten by the next call.
    pub fn harmonic_product_spectrum(&mut self, spectrum: &[u8]) -> Result<&[f64], AnalysisError> {
        let n = self.bin_count();
        if spectrum.len() != n {
            return Err(AnalysisError::InvalidInput {
                reason: format!("expected {} bins, got {}", n, spectrum.len()),
            });
        }

        self.hps.clear();
        self.hps.extend(spectrum.iter().map(|&mag| mag as f64));

        for h in 2..=self.harmonics {
            for i in 0..n.div_ceil(h) {
                self.hps[i] *= spectrum[i * h] as f64;
            }
        }

        Ok(&self.hps)
    }

    /// Estimate the fundamental frequency of a captured spectrum
    ///
    /// # Errors
    /// * `InvalidInput` - spectrum length does not match `fft_size / 2`
    /// * `NoSignal` - band is empty or holds no positive HPS value
    pub fn analyze(&mut self, spectrum: &[u8]) -> Result<SpectrumResult, AnalysisError> {
        let (min_index, max_index) = self.band_indices();
        let hps = self.harmonic_product_spectrum(spectrum)?;

        if min_index >= max_index {
            return Err(AnalysisError::NoSignal {
                reason: format!("search band [{}, {}) holds no bins", min_index, max_index),
            });
        }

        let mut best: Option<(usize, f64)> = None;
        for (offset, &value) in hps[min_index..max_index].iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            // strict comparison keeps the first maximum
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((min_index + offset, value));
            }
        }

        let (peak_bin, peak_value) = best.ok_or_else(|| AnalysisError::NoSignal {
            reason: format!("no energy between bins {} and {}", min_index, max_index),
        })?;

        let peak_frequency_hz = self.bin_to_hz(peak_bin);
        log::debug!(
            "[SpectrumAnalyzer] HPS peak at bin {} ({:.2} Hz), product {:.3e}",
            peak_bin,
            peak_frequency_hz,
            peak_value
        );

        Ok(SpectrumResult {
            peak_bin,
            peak_frequency_hz,
        })
    }
}
