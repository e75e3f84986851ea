//! Retry with exponential backoff.
//!
//! Used for calls that must not block checkout forever: geolocation lookups and
//! persisting an order after the payment has already gone through.

use std::{future::Future, time::Duration};

use tracing::warn;

/// Bounded retry policy with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for every attempt after it.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);

        self.initial_backoff.saturating_mul(1_u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects, or the
/// policy's attempts are exhausted. Returns the last error in the failing cases.
///
/// # Errors
///
/// Returns the error from the final attempt.
pub async fn retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_retryable(&error) => {
                let delay = policy.delay_after_attempt(attempt);

                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
