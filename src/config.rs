//! Configuration management for the knock pipeline
//!
//! All tuning constants (calibration window, threshold rule, HPS band,
//! pressure classification limits and the empirical calibration table)
//! live here so a different tire/vehicle profile can be loaded from JSON
//! without recompiling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::calibration::table::{default_points, CalibrationPoint};
use crate::error::ConfigurationError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub pressure: PressureConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Ambient calibration and knock threshold parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Length of the ambient calibration window
    pub calibration_duration_ms: u64,
    /// Cadence at which ambient peaks are sampled during calibration
    pub sample_interval_ms: u64,
    /// threshold = ambient * multiplier + margin
    pub threshold_multiplier: f32,
    /// Additive margin on the 0-255 byte scale
    pub threshold_margin: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            calibration_duration_ms: 1000,
            sample_interval_ms: 100,
            threshold_multiplier: 1.5,
            threshold_margin: 25.0,
        }
    }
}

/// Harmonic product spectrum parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// Highest harmonic multiplied into the fundamental (inclusive)
    pub harmonics: usize,
    /// Lower edge of the knock resonance band
    pub band_min_hz: f32,
    /// Upper edge of the knock resonance band
    pub band_max_hz: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            harmonics: 5,
            band_min_hz: 60.0,
            band_max_hz: 200.0,
        }
    }
}

/// Frequency to PSI classification rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureConfig {
    /// Frequencies above this ask the operator to remeasure
    pub max_freq_limit: f32,
    /// Frequencies above this are reported as overinflated
    pub overinflated_freq: f32,
    /// Table PSI above this is reported as overinflated ("> psi")
    pub overinflated_psi: i32,
    pub normal_min_psi: i32,
    pub normal_max_psi: i32,
    /// Round the detected frequency to whole Hz before classification
    #[serde(default = "default_round_frequency")]
    pub round_frequency: bool,
    /// Empirical calibration table, searched in order
    #[serde(default = "default_points")]
    pub table: Vec<CalibrationPoint>,
}

fn default_round_frequency() -> bool {
    true
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            max_freq_limit: 125.0,
            overinflated_freq: 95.2,
            overinflated_psi: 100,
            normal_min_psi: 80,
            normal_max_psi: 100,
            round_frequency: default_round_frequency(),
            table: default_points(),
        }
    }
}

/// Analyser (audio collaborator) parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Analysis window; bin count is fft_size / 2
    pub fft_size: usize,
    /// Exponential smoothing between successive spectra (0.0-1.0)
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Cadence of listening ticks, roughly one display refresh
    pub tick_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 4096,
            smoothing_time_constant: 0.1,
            min_decibels: -100.0,
            max_decibels: -30.0,
            tick_interval_ms: 16,
        }
    }
}

impl AudioConfig {
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the bundled assets directory
    pub fn load() -> Self {
        Self::load_from_file("assets/knock_config.json")
    }

    /// Reject parameter combinations the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.pressure.table.is_empty() {
            return Err(ConfigurationError::EmptyTable);
        }
        if self.detection.sample_interval_ms == 0 {
            return Err(ConfigurationError::parameter(
                "sample_interval_ms",
                "must be greater than 0",
            ));
        }
        if self.detection.calibration_duration_ms < self.detection.sample_interval_ms {
            return Err(ConfigurationError::parameter(
                "calibration_duration_ms",
                "must cover at least one sample interval",
            ));
        }
        if !self.detection.threshold_multiplier.is_finite()
            || !self.detection.threshold_margin.is_finite()
        {
            return Err(ConfigurationError::parameter(
                "threshold",
                "multiplier and margin must be finite",
            ));
        }
        if self.spectrum.harmonics == 0 {
            return Err(ConfigurationError::parameter(
                "harmonics",
                "must be at least 1",
            ));
        }
        if !(self.spectrum.band_min_hz >= 0.0 && self.spectrum.band_min_hz < self.spectrum.band_max_hz)
        {
            return Err(ConfigurationError::parameter(
                "band_min_hz",
                format!(
                    "band [{}, {}] is empty",
                    self.spectrum.band_min_hz, self.spectrum.band_max_hz
                ),
            ));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigurationError::parameter(
                "sample_rate",
                "must be greater than 0",
            ));
        }
        if self.audio.fft_size < 2 || !self.audio.fft_size.is_power_of_two() {
            return Err(ConfigurationError::parameter(
                "fft_size",
                format!("{} is not a power of two >= 2", self.audio.fft_size),
            ));
        }
        if !(0.0..=1.0).contains(&self.audio.smoothing_time_constant) {
            return Err(ConfigurationError::parameter(
                "smoothing_time_constant",
                "must be within 0.0-1.0",
            ));
        }
        if self.audio.min_decibels >= self.audio.max_decibels {
            return Err(ConfigurationError::parameter(
                "min_decibels",
                "must be below max_decibels",
            ));
        }
        if self.audio.tick_interval_ms == 0 {
            return Err(ConfigurationError::parameter(
                "tick_interval_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
