//! Time sources.
//!
//! The session timer reads two clocks: the wall clock, which is what gets
//! persisted, and a monotonic high-resolution counter used for live elapsed
//! time. High-resolution readings are milliseconds relative to an arbitrary
//! per-clock origin and may be negative once re-anchored after a restart.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic milliseconds since this clock's origin.
    fn high_res_ms(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(Self::default())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn high_res_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for tests and replays.
///
/// [`ManualClock::advance`] moves both readings together; [`ManualClock::set_wall`]
/// moves only the wall clock, which is how backward drift is simulated.
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, i64)>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new((start, 0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += by;
        state.1 += by.num_milliseconds();
    }

    pub fn set_wall(&self, wall: DateTime<Utc>) {
        self.state.lock().0 = wall;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().0
    }

    fn high_res_ms(&self) -> i64 {
        self.state.lock().1
    }
}
