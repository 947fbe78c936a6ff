// CalibrationStats - ambient noise level and derived knock threshold
//
// Computed once per calibration session from the peak amplitudes sampled
// while the operator stays quiet:
//
//   threshold = mean(peaks) * multiplier + margin
//
// With the defaults (1.5, 25) an ambient level of 50 gives a threshold of 100.

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::CalibrationError;

/// Result of one ambient calibration pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    /// Mean of the sampled peak amplitudes (0-255 scale)
    pub ambient_level: f32,
    /// Peak amplitude a tick must exceed to count as a knock
    pub threshold: f32,
    /// Number of ambient samples the mean was taken over
    pub sample_count: usize,
}

impl CalibrationStats {
    /// Derive statistics from ambient peak samples
    ///
    /// # Returns
    /// * `Err(CalibrationError::NoSamples)` - if `samples` is empty
    pub fn from_samples(samples: &[f32], config: &DetectionConfig) -> Result<Self, CalibrationError> {
        if samples.is_empty() {
            return Err(CalibrationError::NoSamples);
        }

        let ambient_level = samples.iter().sum::<f32>() / samples.len() as f32;
        let threshold = ambient_level * config.threshold_multiplier + config.threshold_margin;

        Ok(Self {
            ambient_level,
            threshold,
            sample_count: samples.len(),
        })
    }

    /// Whether a tick's peak amplitude counts as a knock
    pub fn is_knock(&self, peak: f32) -> bool {
        peak > self.threshold
    }
}
