//! Circuit breaker for the market-data provider.
//!
//! HTTP 403 (IP ban) trips the breaker at once; `threshold` consecutive
//! throttled responses (HTTP 429) trip it too. Missing symbols, malformed
//! payloads and server errors say nothing about throttling and are not
//! counted. While open, the provider refuses requests without touching the
//! network until the cooldown has elapsed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            threshold: threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive throttled responses.
    pub fn default_provider() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_THRESHOLD)
    }

    /// Breaker sized so one symbol's retry schedule runs to completion
    /// before throttling can open it.
    pub fn for_retry_budget(max_attempts: u32) -> Self {
        Self::new(DEFAULT_COOLDOWN, max_attempts.max(DEFAULT_THRESHOLD))
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Check if requests are currently allowed. An expired cooldown closes the breaker.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                tracing::info!("circuit breaker cooldown expired, closing");
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        self.inner.lock().unwrap().consecutive_failures = 0;
    }

    /// Count one throttled response.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.threshold {
            tracing::warn!(
                failures = inner.consecutive_failures,
                cooldown = ?self.cooldown,
                "circuit breaker tripped"
            );
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Trip immediately (403 Forbidden).
    pub fn trip(&self) {
        tracing::warn!(cooldown = ?self.cooldown, "circuit breaker tripped by provider ban");
        self.inner.lock().unwrap().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    /// Remaining cooldown time (zero if closed).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.inner.lock().unwrap().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}
