// Audio acquisition error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes surfaced to the
/// presentation layer alongside the human-readable message.
///
/// Error code range: 1001-1004
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// Input device or stream could not be obtained
    pub const ACQUISITION_UNAVAILABLE: i32 = 1001;

    /// Operator declined microphone access
    pub const PERMISSION_DENIED: i32 = 1002;

    /// Sample source ran out of audio before the cycle finished
    pub const STREAM_ENDED: i32 = 1003;

    /// Audio data could not be interpreted (unsupported WAV layout etc.)
    pub const INVALID_FORMAT: i32 = 1004;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=SampleSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the audio acquisition collaborator
///
/// Device and permission problems are surfaced immediately and the
/// measurement cycle never starts.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Audio input device/stream cannot be obtained
    AcquisitionUnavailable { reason: String },

    /// Microphone permission denied
    PermissionDenied,

    /// Source has no more audio to deliver
    StreamEnded,

    /// Source data is in an unsupported format
    InvalidFormat { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AcquisitionUnavailable { .. } => AudioErrorCodes::ACQUISITION_UNAVAILABLE,
            AudioError::PermissionDenied => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::StreamEnded => AudioErrorCodes::STREAM_ENDED,
            AudioError::InvalidFormat { .. } => AudioErrorCodes::INVALID_FORMAT,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AcquisitionUnavailable { reason } => {
                format!("Audio input unavailable: {}", reason)
            }
            AudioError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            AudioError::StreamEnded => "Audio stream ended before a knock was heard".to_string(),
            AudioError::InvalidFormat { reason } => {
                format!("Unsupported audio format: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AudioError::PermissionDenied,
            _ => AudioError::AcquisitionUnavailable {
                reason: err.to_string(),
            },
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => io.into(),
            other => AudioError::InvalidFormat {
                reason: other.to_string(),
            },
        }
    }
}
