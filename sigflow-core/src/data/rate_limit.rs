//! Minimum spacing between live provider requests.

use crate::retry::Sleeper;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive live fetches.
///
/// The first acquisition never waits. Fresh-cache hits never call `acquire`,
/// so they neither wait nor reset the interval.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until `min_interval` has passed since the previous acquisition.
    pub fn acquire(&self, sleeper: &dyn Sleeper) {
        let mut last = self.last.lock().unwrap();
        if let Some(prev) = *last {
            let wait = self.min_interval.saturating_sub(prev.elapsed());
            if !wait.is_zero() {
                sleeper.sleep(wait);
            }
        }
        *last = Some(Instant::now());
    }
}
