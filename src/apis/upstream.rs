/// Rate-limited, retried calls to one upstream provider
use super::rate_limiter::RateLimiter;
use super::retry::RetryExecutor;
use crate::errors::EngineResult;
use std::future::Future;
use std::sync::Arc;

/// Binds a provider's limiter bucket to its retry policy
///
/// Every attempt, including retries, consumes a token first, so retries
/// count against the provider's ceiling like any other request.
#[derive(Clone)]
pub struct Upstream {
    provider: String,
    limiter: Arc<RateLimiter>,
    retry: RetryExecutor,
}

impl Upstream {
    pub fn new(provider: impl Into<String>, limiter: Arc<RateLimiter>, retry: RetryExecutor) -> Self {
        Self {
            provider: provider.into(),
            limiter,
            retry,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub async fn call<T, F, Fut>(&self, context: &str, mut operation: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let limiter = &self.limiter;
        let provider = self.provider.as_str();

        self.retry
            .execute(context, || {
                let request = operation();
                async move {
                    limiter.acquire(provider).await;
                    request.await
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderLimitConfig;
    use crate::errors::EngineError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_consumes_a_token() {
        let limiter = Arc::new(RateLimiter::single(ProviderLimitConfig::new(
            "jupiter", 10.0, 0.001,
        )));
        let upstream = Upstream::new(
            "jupiter",
            limiter.clone(),
            RetryExecutor::new(3, Duration::from_millis(1)),
        );
        let attempts = AtomicU32::new(0);

        let result: EngineResult<()> = upstream
            .call("fetch", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(EngineError::network("down")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(limiter.available("jupiter") < 7.1);
    }
}
