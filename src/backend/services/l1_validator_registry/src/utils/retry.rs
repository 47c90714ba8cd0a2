use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::utils::errors::ChainError;

/// Bounded retry with doubling backoff for idempotent chain reads.
///
/// Only [`ChainError::is_transient`] failures are retried; anything else is returned on the
/// first attempt. State-mutating submissions must not go through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            retry_count: 0,
            retry_delay: Duration::ZERO,
        }
    }

    pub async fn run<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry_count => {
                    attempt += 1;
                    warn!(op, attempt, retry_count = self.retry_count, error = %e, "retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            retry_count: 3,
            retry_delay: Duration::from_millis(1),
        };

        let result = policy
            .run("read", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ChainError::Timeout)
                } else {
                    Ok(7u64)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            retry_count: 3,
            retry_delay: Duration::from_millis(1),
        };

        let result: Result<(), _> = policy
            .run("read", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainError::Rpc {
                    code: -32000,
                    message: "execution reverted".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(ChainError::Rpc { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_count() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            retry_count: 2,
            retry_delay: Duration::from_millis(1),
        };

        let result: Result<(), _> = policy
            .run("read", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainError::HttpStatus(503))
            })
            .await;

        assert!(matches!(result, Err(ChainError::HttpStatus(503))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
