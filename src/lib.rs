// Tire Knock - tire pressure estimation from the sound of a knock
// Ambient calibration, threshold knock detection, HPS pitch estimation and
// nearest-match PSI classification

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;

// Re-exports for convenience
pub use analysis::{PressureClassification, PressureResult, PsiEstimate};
pub use config::AppConfig;
pub use engine::{MeasurementSession, SessionEvent, TickOutcome};
pub use error::{ErrorCode, MeasurementError};

use once_cell::sync::OnceCell;
use tracing::Level;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber at INFO level
///
/// Safe to call more than once; only the first call has any effect.
pub fn init_logging() {
    init_logging_with_level(Level::INFO);
}

/// Install the fmt subscriber at `level`, writing to stderr
///
/// `log` records from library code are bridged into the same subscriber.
pub fn init_logging_with_level(level: Level) {
    LOGGING.get_or_init(|| {
        let installed = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        if installed.is_ok() {
            log::debug!("[Logging] Subscriber installed at {}", level);
        }
    });
}
