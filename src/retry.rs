//! Retry with back-off for provider calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries it
//! while the caller's predicate says the error is transient. The delay
//! schedule is a [`Backoff`] value so the same loop serves the linear schedule
//! of the severity classifier and anything that wants exponential growth.

use std::future::Future;
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// No wait between attempts.
    Immediate,
    /// `attempt × step` after the n-th failed attempt (1-based).
    Linear { step: Duration },
    /// `base × 2^(attempt-1)`, capped at `cap`.
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    /// Delay to wait after `failed_attempt` (1-based) before the next one.
    ///
    /// | Schedule                 | after 1 | after 2 | after 3 |
    /// |--------------------------|---------|---------|---------|
    /// | `Linear { step: 2s }`    | 2 s     | 4 s     | 6 s     |
    /// | `Exponential { 1s, ..}`  | 1 s     | 2 s     | 4 s     |
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        match *self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Linear { step } => step.saturating_mul(failed_attempt),
            Backoff::Exponential { base, cap } => {
                let shift = failed_attempt.saturating_sub(1).min(20);
                base.saturating_mul(1u32 << shift).min(cap)
            }
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { step },
        }
    }
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or the
/// policy's attempt budget is spent. The operation receives the 1-based
/// attempt number. The last error is returned on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = policy.backoff.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient provider error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
