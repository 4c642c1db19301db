//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is retryable (status predicate from config)
//! - Execute retries with exponential backoff + jitter
//! - Stop after a bounded number of attempts and hand back the last error
//!
//! # Design Decisions
//! - Only idempotent calls go through a policy; transaction sends never do
//! - Callers supply the error predicate so transport and status errors can differ

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::schema::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// HTTP statuses worth retrying.
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay)
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. `call` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, operation: &str, mut call: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
