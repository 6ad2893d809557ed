//! Exponential backoff policy for throttled requests
//!
//! The policy is a pure description of *when* to retry; the HTTP dispatcher
//! owns the loop and the sleeping. With the defaults a request is retried at
//! most three times, waiting 1 s, 2 s and 4 s.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use wecare_core::retry::RetryConfig;
//!
//! let policy = RetryConfig::default();
//! assert!(policy.should_retry(2));
//! assert!(!policy.should_retry(3));
//! assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Whether retry number `attempt` (zero-based) may still be issued
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait before retry number `attempt` (zero-based)
    ///
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    /// A result that is not a valid duration (negative multiplier) falls back
    /// to `max_delay`.
    #[must_use]
    pub fn delay_for_retry(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        Duration::try_from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
            .unwrap_or(self.max_delay)
    }

    /// Sum of every delay the policy can impose on a single request
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        (0..self.max_attempts).map(|a| self.delay_for_retry(a)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_policy() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_retry(2), Duration::from_secs(4));
        assert_eq!(config.worst_case_wait(), Duration::from_secs(7));
    }

    #[test]
    fn test_budget_is_bounded() {
        let config = RetryConfig::default();

        assert!(config.should_retry(0));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
        assert!(!RetryConfig::no_retry().should_retry(0));
    }

    #[test]
    fn test_delay_capped() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(3),
            ..Default::default()
        };

        assert_eq!(config.delay_for_retry(5), Duration::from_secs(3));
    }

    #[test]
    fn test_negative_multiplier_does_not_panic() {
        let config = RetryConfig {
            backoff_multiplier: -2.0,
            ..Default::default()
        };

        assert_eq!(config.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_retry(1), config.max_delay);
    }

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(attempt in 0u32..64, cap in 1u64..120) {
            let config = RetryConfig {
                max_delay: Duration::from_secs(cap),
                ..Default::default()
            };
            prop_assert!(config.delay_for_retry(attempt) <= Duration::from_secs(cap));
        }

        #[test]
        fn delay_doubles_below_cap(attempt in 0u32..4) {
            let config = RetryConfig::default();
            prop_assert_eq!(
                config.delay_for_retry(attempt),
                Duration::from_secs(1 << attempt)
            );
        }
    }
}
