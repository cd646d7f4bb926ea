//! Retry policies as data.
//!
//! A `RetryPolicy` bundles the attempt budget, the backoff schedule, and the
//! predicate deciding which errors are worth another attempt. The ingestor and
//! the store each carry one; neither weaves retry loops into its own code.

use std::fmt;
use std::time::Duration;

/// Something that can block the current thread for a duration.
///
/// Production code uses [`ThreadSleeper`]; tests substitute a recorder so
/// backoff schedules can be asserted without waiting.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded retry with exponential (or fixed, when `multiplier == 1`) backoff.
pub struct RetryPolicy<E> {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    pub multiplier: u32,
    /// Errors for which this returns false end the loop immediately.
    pub retryable: fn(&E) -> bool,
}

// Manual impls: derives would demand `E: Clone`/`E: Debug`.
impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("multiplier", &self.multiplier)
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32, initial_backoff: Duration, retryable: fn(&E) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: initial_backoff,
            multiplier: 1,
            retryable,
        }
    }

    /// Switch to exponential backoff capped at `max_backoff`.
    pub fn exponential(mut self, multiplier: u32, max_backoff: Duration) -> Self {
        self.multiplier = multiplier.max(1);
        self.max_backoff = max_backoff;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned on failure.
    pub fn run<T>(&self, sleeper: &dyn Sleeper, mut op: impl FnMut(u32) -> Result<T, E>) -> Result<T, E>
    where
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && (self.retryable)(&e) => {
                    let delay = self.delay(attempt);
                    tracing::debug!(attempt, ?delay, error = %e, "retrying after transient error");
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingSleeper;
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn is_transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    fn fetch_like() -> RetryPolicy<TestError> {
        RetryPolicy::new(5, Duration::from_secs(2), is_transient)
            .exponential(2, Duration::from_secs(10))
    }

    #[test]
    fn exponential_schedule_is_capped() {
        let p = fetch_like();
        let delays: Vec<u64> = (1..=5).map(|a| p.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 10, 10]);
    }

    #[test]
    fn fixed_schedule_when_not_exponential() {
        let p: RetryPolicy<TestError> =
            RetryPolicy::new(3, Duration::from_millis(500), is_transient);
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(3), Duration::from_millis(500));
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let p = fetch_like();
        assert_eq!(p.delay(200), Duration::from_secs(10));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let result = fetch_like().run(&sleeper, |attempt| {
            if attempt < 3 {
                Err(TestError::Transient)
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn stops_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Result<(), _> = fetch_like().run(&sleeper, |_| {
            calls += 1;
            Err(TestError::Transient)
        });
        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls, 5);
        assert_eq!(sleeper.calls().len(), 4);
    }

    #[test]
    fn fatal_error_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Result<(), _> = fetch_like().run(&sleeper, |_| {
            calls += 1;
            Err(TestError::Fatal)
        });
        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls, 1);
        assert!(sleeper.calls().is_empty());
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let p: RetryPolicy<TestError> = RetryPolicy::new(0, Duration::ZERO, is_transient);
        assert_eq!(p.max_attempts, 1);
    }
}
