//! Retry with linear backoff for backend reads.
//!
//! A failed attempt `n` (1-based) waits `n * base_delay` before the next one.
//! Errors that report themselves as non-retryable, such as permission
//! denials, end the loop at once.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::BackendError;
use crate::config::RetrySettings;

/// Errors that know whether trying again could help.
pub trait Retryable {
    /// Whether another attempt could succeed.
    fn is_retryable(&self) -> bool;
}

impl Retryable for BackendError {
    /// Permission denials, missing tables, malformed responses and local
    /// failures (bad JSON, bad URL, no service key) are permanent. Everything else, including
    /// transport errors and 5xx answers, is retried.
    fn is_retryable(&self) -> bool {
        if self.is_permission_denied() || self.is_missing_table() {
            return false;
        }
        !matches!(
            self,
            Self::Parse(_)
                | Self::MalformedResponse(_)
                | Self::InvalidUrl(_)
                | Self::MissingServiceKey
        )
    }
}

/// How many times to try a read and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetrySettings::default())
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(settings.attempts, settings.base_delay)
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(attempt, error = %err, "Backend request failed permanently");
                    return Err(err);
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!(
                        attempts = attempt,
                        error = %err,
                        "Backend request failed after all attempts"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Backend request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
