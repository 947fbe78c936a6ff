//! Engine module driving measurement cycles.
//!
//! `session` owns one cycle's state machine and publishes `events`;
//! `clock` and `driver` supply the outer tick loop for offline and live runs.

pub mod clock;
pub mod driver;
pub mod events;
pub mod session;

pub use clock::{StubTimeSource, SystemTimeSource, TimeSource};
pub use driver::{run_until_complete, CycleEnd, CycleReport};
pub use events::{EventPublisher, SessionEvent};
pub use session::{CancelHandle, MeasurementSession, TickOutcome};
