//! Time sources used to drive measurement sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Trait representing a monotonic clock plus a way to wait on it.
///
/// The session itself never reads a clock; drivers translate `now()` into
/// milliseconds since the cycle began and pace ticks with `wait()`.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;

    /// Block until roughly `interval` has passed on this clock
    fn wait(&self, interval: Duration);
}

/// Default time source backed by `Instant::now` and real sleeps.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Deterministic time source for offline runs and tests.
///
/// Time only moves when `wait()` is called, so a recorded knock replays
/// tick-for-tick identically regardless of machine speed.
pub struct StubTimeSource {
    start: Instant,
    offset_ms: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Milliseconds elapsed on this clock
    pub fn elapsed_ms(&self) -> u64 {
        self.offset_ms.load(Ordering::SeqCst)
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        self.start + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    fn wait(&self, interval: Duration) {
        self.offset_ms
            .fetch_add(interval.as_millis() as u64, Ordering::SeqCst);
    }
}
