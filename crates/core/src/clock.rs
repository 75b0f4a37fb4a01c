use parking_lot::Mutex;

use crate::types::Timestamp;

/// Source of the current time used for deadline checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Clock that only moves when told to. Used by the simulator to advance
/// time by simulated execution durations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    /// Move the clock forward by `secs` (negative values are ignored).
    pub fn advance(&self, secs: f64) -> Timestamp {
        let mut now = self.now.lock();
        if secs > 0.0 {
            *now += secs;
        }
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
