//! Bounded retry with exponential backoff for provider requests.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CloudError, Result};

/// Retry settings for transient provider failures.
///
/// Attempt `n` (1-based) waits `base_delay_ms * 2^(n-1)` before retrying:
/// 500 ms, 1 s, 2 s with the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// A 429 that survives every retry becomes [`CloudError::Quota`].
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay(retry);
                    warn!(
                        "{what} failed ({e}); retry {retry}/{} in {} ms",
                        self.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(CloudError::Http { status: 429, .. }) => {
                    return Err(CloudError::Quota {
                        attempts: retry + 1,
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn http(status: u16) -> CloudError {
        CloudError::Http {
            status,
            url: "https://example.com".into(),
            detail: String::new(),
        }
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(2), Duration::from_millis(1000));
        assert_eq!(p.delay(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let calls = Cell::new(0);
        let out = fast(3)
            .run("search", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(http(503))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 3);
    }

    #[tokio::test]
    async fn auth_and_client_errors_are_not_retried() {
        let calls = Cell::new(0);
        let err = fast(3)
            .run("sign", || {
                calls.set(calls.get() + 1);
                async {
                    Err::<(), _>(CloudError::Auth {
                        status: 403,
                        detail: "forbidden".into(),
                    })
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Auth { status: 403, .. }));
        assert_eq!(calls.get(), 1);

        calls.set(0);
        let err = fast(3)
            .run("search", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(http(404)) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Http { status: 404, .. }));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn persistent_rate_limit_becomes_quota() {
        let calls = Cell::new(0);
        let err = fast(2)
            .run("download", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(http(429)) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Quota { attempts: 3 }));
        assert_eq!(calls.get(), 3);
    }
}
