//! Retry with exponential backoff for transient provider errors.
//!
//! The executor does not decide what is retryable. `execute` retries every
//! error; `execute_with_condition` lets the caller supply the predicate.
//! Drivers only wrap provider calls, never request validation.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use unistore_common::{Result, Error, RetrySettings};

/// Retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Cap for exponential growth.
    pub max_delay: Duration,
    /// Double the delay after every failure instead of keeping it constant.
    pub exponential_backoff: bool,
    /// Scale each delay by a random factor in `[0.75, 1.25)`.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Policy with `max_attempts` and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            exponential_backoff: true,
            jitter: false,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Set base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable exponential growth.
    pub fn with_exponential_backoff(mut self, exponential: bool) -> Self {
        self.exponential_backoff = exponential;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the failed attempt with 0-based index `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            self.base_delay.saturating_mul(1u32 << attempt.min(31))
        } else {
            self.base_delay
        };
        let capped = delay.min(self.max_delay);

        if self.jitter {
            let factor = 0.75 + rand::random::<f64>() * 0.5;
            capped.mul_f64(factor).min(self.max_delay)
        } else {
            capped
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            exponential_backoff: settings.exponential_backoff,
            jitter: settings.jitter,
        }
    }
}

/// Runs operations under a `RetryPolicy`.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute an operation, retrying on any error.
    ///
    /// When attempts run out the error of the final attempt is returned
    /// as-is.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_condition(operation, |_| true).await
    }

    /// Execute with a custom retry condition.
    ///
    /// Errors rejected by `should_retry` are returned immediately.
    pub async fn execute_with_condition<F, Fut, T, C>(
        &self,
        operation: F,
        should_retry: C,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&Error) -> bool,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !should_retry(&err) {
                        return Err(err);
                    }

                    if attempt + 1 >= max_attempts {
                        warn!("Operation failed after {} attempts: {}", max_attempts, err);
                        return Err(err);
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        "Attempt {} failed: {}. Retrying in {:?}...",
                        attempt + 1,
                        err,
                        delay
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Convenience function for retry with a custom policy.
pub async fn retry_with_policy<F, Fut, T>(policy: RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryExecutor::new(policy).execute(operation).await
}
