use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

use crate::error::{ExtractError, Result};

/// Exponential backoff bounded by both an attempt count and a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_retries: usize,
        initial_backoff_ms: u64,
        max_backoff_ms: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `f` until it succeeds or fails with a non-retryable error.
    ///
    /// A resource that is still processing when attempts or time run out is
    /// reported as [`ExtractError::NotReady`].
    pub async fn retry<F, Fut, T>(&self, operation_name: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();

        match timeout(self.timeout, self.retry_inner(operation_name, f)).await {
            Ok(Err(ExtractError::StillProcessing(resource))) => Err(ExtractError::NotReady {
                resource,
                waited: started.elapsed(),
            }),
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation = operation_name,
                    timeout_ms = self.timeout.as_millis(),
                    "Operation timed out"
                );
                Err(ExtractError::NotReady {
                    resource: operation_name.to_string(),
                    waited: started.elapsed(),
                })
            }
        }
    }

    async fn retry_inner<F, Fut, T>(&self, operation_name: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Operation not ready, retrying"
                    );

                    sleep(backoff).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, 500, 5000, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1, 4, 5)
    }

    #[tokio::test]
    async fn test_succeeds_after_processing() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result = fast_policy(5)
            .retry("files/abc", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ExtractError::StillProcessing("files/abc".into()))
                } else {
                    Ok("ACTIVE")
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "ACTIVE");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_not_ready() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let err = fast_policy(2)
            .retry("files/slow", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ExtractError::StillProcessing("files/slow".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NotReady { ref resource, .. } if resource == "files/slow"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let err = fast_policy(5)
            .retry("files/broken", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ExtractError::ProcessingFailed("files/broken".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::ProcessingFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_ready() {
        let policy = RetryPolicy::new(1000, 20, 20, 60).with_timeout(Duration::from_millis(50));

        let err = policy
            .retry("files/stuck", || async {
                Err::<(), _>(ExtractError::StillProcessing("files/stuck".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NotReady { .. }));
    }
}
