//! Retry decisions driven by the failure taxonomy.
//!
//! Only [`ErrorKind::Network`] and [`ErrorKind::Server`] are retried, with
//! exponential backoff. Exhausting the attempts surfaces the original kind.

use super::classify::ErrorKind;
use crate::config::RetryConfig;
use serde::Serialize;
use std::time::Duration;

/// Number of automatic retries a retryable failure gets before it becomes terminal.
pub const MAX_ATTEMPTS: u32 = 4;

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryDecision {
    /// Whether the job should be rescheduled
    pub should_retry: bool,

    /// How long to wait before the next attempt (zero when not retrying)
    pub delay: Duration,

    /// True iff the failure is final
    pub is_terminal: bool,
}

impl RetryDecision {
    fn retry_after(delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay,
            is_terminal: false,
        }
    }

    fn terminal() -> Self {
        Self {
            should_retry: false,
            delay: Duration::ZERO,
            is_terminal: true,
        }
    }
}

/// Exponential backoff policy: `base * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Decide what to do after a failure of `kind`.
    ///
    /// `attempt` is the number of retries already performed for this job
    /// (0 on the first failure).
    pub fn decide(&self, kind: ErrorKind, attempt: u32) -> RetryDecision {
        if !kind.is_retryable() || attempt >= MAX_ATTEMPTS {
            return RetryDecision::terminal();
        }
        RetryDecision::retry_after(self.backoff_duration(attempt))
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay = base_ms.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(10), Duration::from_secs(30));
        assert_eq!(policy.backoff_duration(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_retryable_kinds_retry_until_exhausted() {
        let policy = RetryPolicy::default();
        for kind in [ErrorKind::Network, ErrorKind::Server] {
            for attempt in 0..MAX_ATTEMPTS {
                let decision = policy.decide(kind, attempt);
                assert!(decision.should_retry, "{kind} attempt {attempt}");
                assert!(!decision.is_terminal);
                assert_eq!(decision.delay, policy.backoff_duration(attempt));
            }
            let exhausted = policy.decide(kind, MAX_ATTEMPTS);
            assert!(!exhausted.should_retry);
            assert!(exhausted.is_terminal);
        }
    }

    #[test]
    fn test_non_retryable_kinds_are_terminal_immediately() {
        let policy = RetryPolicy::default();
        for kind in [
            ErrorKind::Auth,
            ErrorKind::RateLimit,
            ErrorKind::Parse,
            ErrorKind::Validation,
            ErrorKind::PermissionDenied,
        ] {
            for attempt in [0, 1, MAX_ATTEMPTS] {
                let decision = policy.decide(kind, attempt);
                assert_eq!(decision, RetryDecision::terminal(), "{kind}");
            }
        }
    }

    #[test]
    fn test_terminal_iff_not_retrying() {
        let policy = RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(50));
        for kind in ErrorKind::ALL {
            for attempt in 0..=MAX_ATTEMPTS + 1 {
                let d = policy.decide(kind, attempt);
                assert_eq!(d.is_terminal, !d.should_retry);
            }
        }
    }
}
