// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes;

impl CalibrationErrorCodes {
    /// No ambient samples were collected during the calibration window
    pub const NO_SAMPLES: i32 = 2001;

    /// A measurement cycle is already active
    pub const ALREADY_IN_PROGRESS: i32 = 2002;

    /// Operation requires an active cycle but the detector is idle
    pub const NOT_ACTIVE: i32 = 2003;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=KnockDetector, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration and cycle-lifecycle errors
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration window expired without a single ambient sample
    NoSamples,

    /// Calibration already in progress
    AlreadyInProgress,

    /// No measurement cycle is active
    NotActive,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NoSamples => CalibrationErrorCodes::NO_SAMPLES,
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::NotActive => CalibrationErrorCodes::NOT_ACTIVE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NoSamples => {
                "No ambient samples collected during calibration".to_string()
            }
            CalibrationError::AlreadyInProgress => "Calibration already in progress".to_string(),
            CalibrationError::NotActive => "No measurement cycle is active".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
