//! Bounded retry with exponential backoff for remote calls.
//!
//! The policy wraps one remote call at a time. Composite operations are
//! never retried as a whole, so partial progress is not replayed.

use crate::config::RetryConfig;
use crate::error::EngineResult;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Retries remote calls that fail with a rate-limit signal.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    retries: AtomicU64,
}

impl RetryPolicy {
    /// Creates a retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: AtomicU64::new(0),
        }
    }

    /// Returns the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total number of retries performed so far.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Runs `operation`, retrying rate-limited failures.
    ///
    /// The operation is invoked at most `max_attempts` times. Failures that
    /// are not rate limits are returned immediately without delay; after the
    /// last attempt the last error is returned.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let delay = self.config.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(label, attempt, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() && attempt + 1 < max_attempts => {
                    warn!(label, attempt, error = %e, "rate limited, will retry");
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        warn!(label, attempts = attempt + 1, "retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::new(max_attempts)
                .with_initial_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20)),
        )
    }

    #[tokio::test]
    async fn always_rate_limited_runs_exactly_max_attempts() {
        let policy = fast_policy(3);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute("fetch", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(SyncError::remote("HTTP 429: rate limit exceeded"))
                }
            })
            .await;

        assert!(matches!(result, Err(SyncError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(policy.retries(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let policy = fast_policy(5);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute("fetch", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(SyncError::Network("connection refused".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(SyncError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.retries(), 0);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let policy = fast_policy(3);
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy
            .execute("append", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(SyncError::RateLimited("quota".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 5ms before the second attempt, 10ms before the third.
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn success_needs_one_call() {
        let policy = RetryPolicy::default();
        let value = policy.execute("read", || async { Ok("ok") }).await.unwrap();
        assert_eq!(value, "ok");
        assert_eq!(policy.retries(), 0);
    }
}
