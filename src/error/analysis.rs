// Spectrum analysis error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 3001-3002
pub struct AnalysisErrorCodes;

impl AnalysisErrorCodes {
    pub const NO_SIGNAL: i32 = 3001;
    pub const INVALID_INPUT: i32 = 3002;
}

/// Log an analysis error with structured context
///
/// Analysis failures are inconclusive measurements rather than faults,
/// so they are logged at warn level.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    warn!(
        "Analysis error in {}: code={}, component=SpectrumAnalyzer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while extracting a fundamental from a captured spectrum
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No usable peak inside the search band
    NoSignal { reason: String },

    /// Buffer or parameters inconsistent with each other
    InvalidInput { reason: String },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::NoSignal { .. } => AnalysisErrorCodes::NO_SIGNAL,
            AnalysisError::InvalidInput { .. } => AnalysisErrorCodes::INVALID_INPUT,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::NoSignal { reason } => {
                format!("No usable knock signal: {}", reason)
            }
            AnalysisError::InvalidInput { reason } => format!("Invalid analysis input: {}", reason),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}
