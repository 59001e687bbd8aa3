//! Bounded retry policy for transport failures
//!
//! The policy counts consecutive transport failures of the status request. Each
//! failure within the budget is answered with a fixed re-poll delay; the first
//! failure beyond the budget is terminal. Any successful poll, whatever status
//! it reports, resets the count.
//!
//! # Example
//!
//! ```
//! use bili2text_monitor::config::RetryConfig;
//! use bili2text_monitor::error::Error;
//! use bili2text_monitor::retry::{RetryDecision, RetryPolicy};
//!
//! let mut policy = RetryPolicy::new(RetryConfig::default());
//! let failure = Error::Http { status: 502, body: String::new() };
//!
//! for _ in 0..5 {
//!     assert!(matches!(policy.record_failure(&failure), RetryDecision::RetryAfter(_)));
//! }
//! assert_eq!(policy.record_failure(&failure), RetryDecision::GiveUp);
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transport failures (network errors, timeouts, unreadable bodies) should
/// return `true`. Well-formed rejections and local errors should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the poll should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Any failure to complete the request counts, not only timeouts
            Error::Network(_) => true,
            // Proxies and overloaded servers answer with HTML error pages
            Error::Http { .. } => true,
            Error::Serialization(_) => true,
            Error::MalformedReport(_) => true,
            // The server gave a definitive answer
            Error::Rejected(_) => false,
            Error::Config { .. } => false,
            Error::InvalidUrl(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// What to do after a failed poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-poll after the given delay
    RetryAfter(Duration),
    /// Stop monitoring with an `Errored` outcome
    GiveUp,
}

/// Consecutive-failure counter for one monitor run
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    consecutive_failures: u32,
}

impl RetryPolicy {
    /// Create a policy with no failures recorded
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Number of transport failures since the last successful poll
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a successful poll, resetting the failure count
    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::info!(
                failures = self.consecutive_failures,
                "Status poll succeeded after retry"
            );
        }
        self.consecutive_failures = 0;
    }

    /// Record a failed poll and decide whether to retry
    pub fn record_failure<E>(&mut self, error: &E) -> RetryDecision
    where
        E: IsRetryable + std::fmt::Display,
    {
        if !error.is_retryable() {
            tracing::error!(error = %error, "Status poll failed with non-retryable error");
            return RetryDecision::GiveUp;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.consecutive_failures > self.config.max_retries {
            tracing::error!(
                error = %error,
                failures = self.consecutive_failures,
                "Status poll failed after all retry attempts exhausted"
            );
            return RetryDecision::GiveUp;
        }

        let delay = if self.config.jitter {
            add_jitter(self.config.retry_delay)
        } else {
            self.config.retry_delay
        };

        tracing::warn!(
            error = %error,
            attempt = self.consecutive_failures,
            max_retries = self.config.max_retries,
            delay_ms = delay.as_millis(),
            "Status poll failed, retrying"
        );

        RetryDecision::RetryAfter(delay)
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
