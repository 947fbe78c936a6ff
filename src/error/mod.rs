// Error types for the tire knock pressure estimator
//
// Each pipeline stage owns a structured error enum with numeric codes
// suitable for a presentation layer. MeasurementError wraps them so a
// measurement cycle can report a single failure type.

mod analysis;
mod audio;
mod calibration;
mod configuration;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use configuration::{log_configuration_error, ConfigurationError, ConfigurationErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the presentation boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// What the operator should be told about a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Device or permission problem; retrying will not help until it is fixed
    Device,
    /// Analysis inconclusive; knock again
    Inconclusive,
    /// Calibration table or tuning parameters are broken
    Configuration,
}

/// Any failure that aborts a measurement cycle
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementError {
    Audio(AudioError),
    Calibration(CalibrationError),
    Analysis(AnalysisError),
    Configuration(ConfigurationError),
}

impl MeasurementError {
    pub fn category(&self) -> FailureCategory {
        match self {
            MeasurementError::Audio(AudioError::InvalidFormat { .. }) => {
                FailureCategory::Configuration
            }
            MeasurementError::Audio(_) => FailureCategory::Device,
            MeasurementError::Calibration(_) | MeasurementError::Analysis(_) => {
                FailureCategory::Inconclusive
            }
            MeasurementError::Configuration(_) => FailureCategory::Configuration,
        }
    }

    /// Log through the stage-specific helper
    pub fn log(&self, context: &str) {
        match self {
            MeasurementError::Audio(err) => log_audio_error(err, context),
            MeasurementError::Calibration(err) => log_calibration_error(err, context),
            MeasurementError::Analysis(err) => log_analysis_error(err, context),
            MeasurementError::Configuration(err) => log_configuration_error(err, context),
        }
    }
}

impl ErrorCode for MeasurementError {
    fn code(&self) -> i32 {
        match self {
            MeasurementError::Audio(err) => err.code(),
            MeasurementError::Calibration(err) => err.code(),
            MeasurementError::Analysis(err) => err.code(),
            MeasurementError::Configuration(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            MeasurementError::Audio(err) => err.message(),
            MeasurementError::Calibration(err) => err.message(),
            MeasurementError::Analysis(err) => err.message(),
            MeasurementError::Configuration(err) => err.message(),
        }
    }
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementError::Audio(err) => err.fmt(f),
            MeasurementError::Calibration(err) => err.fmt(f),
            MeasurementError::Analysis(err) => err.fmt(f),
            MeasurementError::Configuration(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for MeasurementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeasurementError::Audio(err) => Some(err),
            MeasurementError::Calibration(err) => Some(err),
            MeasurementError::Analysis(err) => Some(err),
            MeasurementError::Configuration(err) => Some(err),
        }
    }
}

impl From<AudioError> for MeasurementError {
    fn from(err: AudioError) -> Self {
        MeasurementError::Audio(err)
    }
}

impl From<CalibrationError> for MeasurementError {
    fn from(err: CalibrationError) -> Self {
        MeasurementError::Calibration(err)
    }
}

impl From<AnalysisError> for MeasurementError {
    fn from(err: AnalysisError) -> Self {
        MeasurementError::Analysis(err)
    }
}

impl From<ConfigurationError> for MeasurementError {
    fn from(err: ConfigurationError) -> Self {
        MeasurementError::Configuration(err)
    }
}
