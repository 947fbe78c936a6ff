// PcmSource - replays a recorded or rendered PCM buffer as a SampleSource
//
// Time is interpreted as milliseconds since the start of the buffer. Each
// read looks at the fft_size samples ending at `now_ms` and hands them to a
// ByteAnalyser, so a WAV capture of a knock goes through exactly the same
// conversion the live analyser applies.

use std::ops::Range;
use std::path::Path;

use crate::audio::analyser::ByteAnalyser;
use crate::audio::source::SampleSource;
use crate::config::AudioConfig;
use crate::error::AudioError;

pub struct PcmSource {
    samples: Vec<f32>,
    sample_rate: u32,
    analyser: ByteAnalyser,
}

impl PcmSource {
    /// Wrap mono samples in -1.0..=1.0 recorded at `sample_rate`
    pub fn new(samples: Vec<f32>, sample_rate: u32, config: &AudioConfig) -> Self {
        Self {
            samples,
            sample_rate,
            analyser: ByteAnalyser::new(config),
        }
    }

    /// Load a WAV file, mixing multi-channel audio down to mono
    ///
    /// # Errors
    /// * `AcquisitionUnavailable` / `PermissionDenied` - file cannot be opened
    /// * `InvalidFormat` - unsupported sample layout, zero sample rate or empty file
    pub fn from_wav(path: impl AsRef<Path>, config: &AudioConfig) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let (samples, sample_rate) = read_wav(path)?;
        if sample_rate == 0 {
            return Err(AudioError::InvalidFormat {
                reason: format!("{} declares a sample rate of 0 Hz", path.display()),
            });
        }
        if samples.is_empty() {
            return Err(AudioError::InvalidFormat {
                reason: format!("{} holds no samples", path.display()),
            });
        }

        log::info!(
            "[PcmSource] Loaded {} ({} samples @ {} Hz, {:.2}s)",
            path.display(),
            samples.len(),
            sample_rate,
            samples.len() as f64 / sample_rate as f64
        );

        Ok(Self::new(samples, sample_rate, config))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Buffer length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000)
            .checked_div(self.sample_rate as u64)
            .unwrap_or(0)
    }

    /// Sample range of the analysis window ending at `now_ms`
    fn window(&self, now_ms: u64) -> Result<Range<usize>, AudioError> {
        let end = (now_ms as u128 * self.sample_rate as u128 / 1000) as usize;
        if end > self.samples.len() {
            return Err(AudioError::StreamEnded);
        }
        let start = end.saturating_sub(self.analyser.fft_size());
        Ok(start..end)
    }
}

impl SampleSource for PcmSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn read_time_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError> {
        let window = self.window(now_ms)?;
        self.analyser.time_domain_bytes(&self.samples[window], out);
        Ok(())
    }

    fn read_frequency_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError> {
        let window = self.window(now_ms)?;
        self.analyser.frequency_bytes(&self.samples[window], out);
        Ok(())
    }
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, hound::Error>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, hound::Error>>()?,
                other => {
                    return Err(AudioError::InvalidFormat {
                        reason: format!(
                            "unsupported bits per sample {} in {}",
                            other,
                            path.display()
                        ),
                    })
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((samples, spec.sample_rate))
}
