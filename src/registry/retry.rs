//! Bounded retries with exponential backoff

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Growth factor applied after every failed attempt
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RegistryError::Config(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if self.multiplier == 0 {
            return Err(RegistryError::Config(
                "retry multiplier must be at least 1".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(RegistryError::Config(format!(
                "initial retry delay ({}ms) exceeds maximum delay ({}ms)",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        let millis = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(millis.min(self.max_delay_ms))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// runs out of attempts, or `cancel` fires.
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(RegistryError::Cancelled);
            }

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= attempts {
                if attempt == 1 {
                    return Err(error);
                }
                return Err(RegistryError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            tracing::debug!(url, attempt, ?delay, error = %error, "retrying request");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn refused() -> RegistryError {
        RegistryError::Transport {
            url: "http://r/v2/a/tags/list".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(10), Duration::from_millis(5_000));
        assert_eq!(policy.delay_for(200), Duration::from_millis(5_000));
    }

    #[test]
    fn test_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::default().with_max_attempts(0).validate().is_err());

        let inverted = RetryPolicy {
            initial_delay_ms: 10_000,
            ..RetryPolicy::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let result = RetryPolicy::default()
            .run("u", &cancel, || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(refused())
                    } else {
                        Ok(vec!["latest".to_string()])
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, vec!["latest".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let err = RetryPolicy::default()
            .with_max_attempts(3)
            .run("u", &cancel, || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(refused())
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_decode_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let err = RetryPolicy::default()
            .run("u", &cancel, || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(RegistryError::Decode {
                        url: "u".to_string(),
                        message: "expected value".to_string(),
                    })
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Decode { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let policy = RetryPolicy {
            max_attempts: 100,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2,
        };
        let err = policy
            .run("u", &cancel, || async { Err::<(), _>(refused()) })
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Cancelled));
    }
}
