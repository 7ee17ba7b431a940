//! Retry combinator
//!
//! One `with_retry` entry point replaces per-call-site retry loops. Callers
//! supply the classification rules: given the error and the attempt number
//! that just failed, either retry after a delay or give up.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounds for a retried operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// What to do with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep this long, then try again
    RetryAfter(Duration),
    /// Not retryable; return the error now
    Fatal,
}

/// Exponential backoff: 2^attempt seconds after the given attempt number
pub fn exponential_backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

/// Run `op` up to `policy.max_attempts` times.
///
/// `op` receives the 1-based attempt number. `classify` is consulted after
/// each failure that still has attempts left; a `Fatal` decision short-
/// circuits, otherwise the combinator sleeps the returned delay and retries.
/// The last error is returned once attempts are exhausted.
pub async fn with_retry<T, E, Op, Fut, Classify>(
    policy: RetryPolicy,
    mut op: Op,
    classify: Classify,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    Classify: Fn(&E, u32) -> RetryDecision,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                match classify(&err, attempt) {
                    RetryDecision::Fatal => return Err(err),
                    RetryDecision::RetryAfter(delay) => {
                        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after error");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
