//! Thin external driver: paces `MeasurementSession::tick` off a `TimeSource`
//! until the cycle ends.

use std::time::Duration;

use serde::Serialize;

use crate::analysis::{KnockEvent, PressureResult};
use crate::audio::SampleSource;
use crate::calibration::CalibrationStats;
use crate::engine::clock::TimeSource;
use crate::engine::session::{MeasurementSession, TickOutcome};
use crate::error::{ConfigurationError, MeasurementError};

/// How a driven cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleEnd {
    Measured,
    Cancelled,
    /// No knock before the time budget ran out
    TimedOut,
}

/// Summary of one driven measurement cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub end: CycleEnd,
    pub calibration: Option<CalibrationStats>,
    pub knock: Option<KnockEvent>,
    pub result: Option<PressureResult>,
    pub ticks: u64,
    pub elapsed_ms: u64,
}

/// Run one full cycle: start, tick every `tick_interval`, stop on result
///
/// Times handed to the session are milliseconds since this call started.
/// The cycle is cancelled once `max_duration` elapses without a knock.
///
/// # Errors
/// * `ConfigurationError::InvalidParameter` - `tick_interval` is zero
/// * whatever `start` or `tick` fail with; the session is Idle afterwards
pub fn run_until_complete<S: SampleSource>(
    session: &mut MeasurementSession<S>,
    clock: &dyn TimeSource,
    tick_interval: Duration,
    max_duration: Duration,
) -> Result<CycleReport, MeasurementError> {
    if tick_interval.is_zero() {
        return Err(ConfigurationError::parameter("tick_interval", "must be greater than 0").into());
    }

    let origin = clock.now();
    let limit_ms = max_duration.as_millis() as u64;

    session.start(0)?;

    let mut report = CycleReport {
        end: CycleEnd::TimedOut,
        calibration: None,
        knock: None,
        result: None,
        ticks: 0,
        elapsed_ms: 0,
    };

    loop {
        clock.wait(tick_interval);
        let now_ms = clock.now().duration_since(origin).as_millis() as u64;
        report.elapsed_ms = now_ms;

        if now_ms > limit_ms {
            session.cancel(now_ms);
            tracing::warn!("[Driver] No knock within {}ms, cycle cancelled", limit_ms);
            report.end = CycleEnd::TimedOut;
            break;
        }

        report.ticks += 1;
        match session.tick(now_ms)? {
            TickOutcome::Calibrated(stats) => report.calibration = Some(stats),
            TickOutcome::Measured { knock, result } => {
                report.knock = Some(knock);
                report.result = Some(result);
                report.end = CycleEnd::Measured;
                break;
            }
            TickOutcome::Cancelled | TickOutcome::Idle => {
                report.end = CycleEnd::Cancelled;
                break;
            }
            TickOutcome::Calibrating { .. } | TickOutcome::Listening { .. } => {}
        }
    }

    log::info!(
        "[Driver] Cycle ended ({:?}) after {} ticks / {}ms",
        report.end,
        report.ticks,
        report.elapsed_ms
    );
    Ok(report)
}
