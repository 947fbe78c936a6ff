// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 4001-4003
pub struct ConfigurationErrorCodes;

impl ConfigurationErrorCodes {
    pub const EMPTY_TABLE: i32 = 4001;
    pub const INVALID_POINT: i32 = 4002;
    pub const INVALID_PARAMETER: i32 = 4003;
}

pub fn log_configuration_error(err: &ConfigurationError, context: &str) {
    error!(
        "Configuration error in {}: code={}, component=Config, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Invalid or missing configuration data
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Calibration table has no points
    EmptyTable,

    /// A calibration point is unusable (non-finite frequency)
    InvalidPoint { index: usize, reason: String },

    /// A tuning parameter is out of range
    InvalidParameter { name: String, reason: String },
}

impl ConfigurationError {
    pub(crate) fn parameter(name: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for ConfigurationError {
    fn code(&self) -> i32 {
        match self {
            ConfigurationError::EmptyTable => ConfigurationErrorCodes::EMPTY_TABLE,
            ConfigurationError::InvalidPoint { .. } => ConfigurationErrorCodes::INVALID_POINT,
            ConfigurationError::InvalidParameter { .. } => {
                ConfigurationErrorCodes::INVALID_PARAMETER
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigurationError::EmptyTable => "Calibration table is empty".to_string(),
            ConfigurationError::InvalidPoint { index, reason } => {
                format!("Calibration point {} invalid: {}", index, reason)
            }
            ConfigurationError::InvalidParameter { name, reason } => {
                format!("Invalid parameter {}: {}", name, reason)
            }
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigurationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigurationError {}
