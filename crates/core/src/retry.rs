//! Exponential-backoff retry policy for generation tasks.
//!
//! Transient failures (rate limits, timeouts, storage hiccups) are
//! retried with a capped exponential delay plus jitter. Permanent
//! failures are never retried.

use std::time::Duration;

use rand::Rng;

use crate::error::CoreError;

/// Default maximum number of attempts per task stage (initial + retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Tunable parameters for the retry strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum total attempts, counting the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Fraction of the computed delay added as random jitter (0.0..=1.0).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Whether a task that just failed on `attempt` (1-based) with `error`
    /// should be re-enqueued.
    pub fn should_retry(&self, attempt: u32, error: &CoreError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Base delay before retry number `attempt` (1-based; attempt 1 is
    /// the first retry). Grows as `initial * multiplier^(attempt - 1)`,
    /// clamped to `max_delay`. No jitter applied.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = self.multiplier.powi(exp.min(31) as i32);
        let ms = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(ms).min(self.max_delay)
    }

    /// Full delay before retry number `attempt`, with random jitter added
    /// so that sibling pages retrying in lockstep do not hammer the
    /// provider at the same instant.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let max_extra = (base.as_millis() as f64 * self.jitter) as u64;
        let extra = if max_extra == 0 {
            0
        } else {
            rand::rng().random_range(0..=max_extra)
        };
        base + Duration::from_millis(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(1), Duration::from_secs(1));
        assert_eq!(policy.base_delay(2), Duration::from_secs(2));
        assert_eq!(policy.base_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn base_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(policy.base_delay(10), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.delay(2);
            let base = policy.base_delay(2);
            assert!(d >= base);
            assert!(d <= base + Duration::from_millis((base.as_millis() as f64 * 0.25) as u64));
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(policy.delay(3), policy.base_delay(3));
    }

    #[test]
    fn retries_transient_until_max_attempts() {
        let policy = RetryPolicy::default();
        let err = CoreError::TransientProvider("429".into());
        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn never_retries_permanent() {
        let policy = RetryPolicy::default();
        let err = CoreError::PermanentProvider("content policy".into());
        assert!(!policy.should_retry(1, &err));
    }

    #[test]
    fn storage_errors_are_retried() {
        let policy = RetryPolicy::default();
        let err = CoreError::Storage("rename failed".into());
        assert!(policy.should_retry(1, &err));
    }
}
