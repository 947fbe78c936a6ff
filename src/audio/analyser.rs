// ByteAnalyser - PCM window to byte waveform and byte spectrum
//
// Mirrors the behaviour of a Web Audio AnalyserNode so the pipeline sees the
// same kind of data it would get from a microphone in the field:
//
// Time domain:  byte = floor(128 * (1 + sample)), clamped to 0..=255
// Frequency:    Blackman window -> FFT -> |X[k]| / N
//               smoothed[k] = tau * smoothed[k] + (1 - tau) * |X[k]| / N
//               dB = 20 * log10(smoothed[k])
//               byte = floor(255 * (dB - min_dB) / (max_dB - min_dB)), clamped
//
// Smoothing state persists between spectrum reads, exactly like the node.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::AudioConfig;

pub struct ByteAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Blackman window (pre-computed)
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothing_time_constant: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl ByteAnalyser {
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / fft_size as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothing_time_constant: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|value| *value = 0.0);
    }

    /// Convert the newest `out.len()` samples of `window` to unsigned bytes
    pub fn time_domain_bytes(&self, window: &[f32], out: &mut [u8]) {
        let start = window.len().saturating_sub(out.len());
        let recent = &window[start..];
        let pad = out.len() - recent.len();

        out[..pad].fill(128);
        for (byte, &sample) in out[pad..].iter_mut().zip(recent) {
            *byte = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Compute smoothed byte magnitudes for a window of `fft_size` samples
    ///
    /// Shorter windows are zero-padded at the front; `out` receives up to
    /// `fft_size / 2` bins.
    pub fn frequency_bytes(&mut self, window: &[f32], out: &mut [u8]) {
        let n = self.fft_size;
        let start = window.len().saturating_sub(n);
        let recent = &window[start..];
        let pad = n - recent.len();

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.smoothing_time_constant;
        let range = self.max_decibels - self.min_decibels;
        let scale = 1.0 / n as f32;

        for (k, byte) in out.iter_mut().take(n / 2).enumerate() {
            let magnitude = self.scratch[k].norm() * scale;
            let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            self.smoothed[k] = smoothed;

            *byte = if smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - self.min_decibels) / range)
                    .floor()
                    .clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }
}
