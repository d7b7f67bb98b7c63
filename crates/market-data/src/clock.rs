//! Time source abstraction.
//!
//! Health tracking and caching read time through [`Clock`] so their state
//! transitions can be driven deterministically in tests. Monotonic time is
//! `tokio::time::Instant`, which also honours a paused tokio clock.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic now, used for windows and TTLs.
    fn now(&self) -> Instant;

    /// Wall-clock now in unix seconds, used for record timestamps.
    fn unix_now(&self) -> i64;
}

/// Real time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually advanced clock.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    origin_unix: i64,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_unix: Utc::now().timestamp(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|p| p.into_inner());
        *elapsed += by;
    }

    fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn unix_now(&self) -> i64 {
        self.origin_unix + self.elapsed().as_secs() as i64
    }
}
