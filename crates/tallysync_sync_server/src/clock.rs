//! Server time sources.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tallysync_core::time;

/// Source of server-assigned instants.
pub trait Clock: Send + Sync {
    /// Returns the current instant at millisecond precision.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that never repeats or goes backwards within one process.
///
/// Two calls in the same millisecond return consecutive milliseconds.
#[derive(Debug)]
pub struct SystemClock {
    last: Mutex<DateTime<Utc>>,
}

impl SystemClock {
    /// Creates a system clock.
    pub fn new() -> Self {
        Self {
            last: Mutex::new(time::earliest()),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let wall = time::truncate_millis(Utc::now());
        let next = if wall > *last {
            wall
        } else {
            *last + Duration::milliseconds(1)
        };
        *last = next;
        next
    }
}

/// Hand-driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, Duration)>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new((time::truncate_millis(start), Duration::zero())),
        }
    }

    /// Makes every read advance the clock by `tick` afterwards.
    pub fn with_tick(self, tick: Duration) -> Self {
        self.state.lock().1 = tick;
        self
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.state.lock().0 = time::truncate_millis(instant);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += by;
    }

    /// Returns the current reading without ticking.
    pub fn peek(&self) -> DateTime<Utc> {
        self.state.lock().0
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock();
        let now = state.0;
        state.0 = now + state.1;
        now
    }
}
