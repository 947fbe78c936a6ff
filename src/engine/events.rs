//! Session notifications published to UI, CLI and test observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::{DetectorState, KnockEvent, PressureResult};
use crate::calibration::CalibrationStats;
use crate::error::{ErrorCode, FailureCategory, MeasurementError};

/// Buffer size of the session event channel
///
/// Listening ticks publish one amplitude event each; 256 covers roughly four
/// seconds at display refresh rate before slow subscribers start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: DetectorState,
        to: DetectorState,
        timestamp_ms: u64,
    },
    Calibrated(CalibrationStats),
    /// Live input level for a volume meter, 0.0-1.0
    Amplitude {
        ratio: f32,
        timestamp_ms: u64,
    },
    Knock(KnockEvent),
    Result(PressureResult),
    Failed {
        code: i32,
        category: FailureCategory,
        message: String,
    },
}

impl SessionEvent {
    pub fn failed(err: &MeasurementError) -> Self {
        SessionEvent::Failed {
            code: err.code(),
            category: err.category(),
            message: err.message(),
        }
    }
}

/// Sending half of the session channel
///
/// Publishing never blocks and never fails the session: with no subscriber
/// the event is simply dropped.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // Err only means nobody is listening
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
