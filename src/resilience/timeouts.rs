//! Timeout enforcement.
//!
//! Wraps external calls with a deadline. Timeout errors carry the operation
//! label and are distinct from the call's own failures.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// An operation exceeded its deadline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} timed out after {elapsed_ms} ms")]
pub struct TimeoutError {
    pub operation: String,
    pub elapsed_ms: u64,
}

/// Run `fut` under `deadline`.
pub async fn with_timeout<F, T>(operation: &str, deadline: Duration, fut: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut).await.map_err(|_| TimeoutError {
        operation: operation.to_string(),
        elapsed_ms: deadline.as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_timeout("fast", Duration::from_millis(200), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_times_out() {
        let err = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "slow timed out after 10 ms");
    }
}
