/// Token-bucket rate limiter keyed by provider
///
/// Each provider gets its own bucket:
/// - Refill is lazy: `elapsed_ms * refill_per_second / 1000`, capped at capacity
/// - A call with a whole token available proceeds immediately
/// - Otherwise it sleeps `(1 - tokens) * (1000 / refill_per_second)` ms and re-checks
///
/// The bucket map lock is never held across a sleep, so waiting callers do
/// not block other providers.
use crate::config::{ProviderLimitConfig, RateLimitsConfig};
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Float slack so a bucket refilled to 0.999999... still counts as one token
const TOKEN_EPSILON: f64 = 1e-9;

#[derive(Debug)]
struct TokenBucket {
    tokens_available: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_per_second: f64,
}

impl TokenBucket {
    fn new(limit: &ProviderLimitConfig, now: Instant) -> Self {
        Self {
            tokens_available: if limit.start_full { limit.max_tokens } else { 0.0 },
            last_refill: now,
            max_tokens: limit.max_tokens,
            refill_per_second: limit.refill_per_second,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(self.last_refill).as_secs_f64() * 1000.0;
        let tokens_to_add = elapsed_ms * self.refill_per_second / 1000.0;
        self.tokens_available = (self.tokens_available + tokens_to_add).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens_available + TOKEN_EPSILON >= 1.0 {
            self.tokens_available = (self.tokens_available - 1.0).max(0.0);
            return Ok(());
        }

        let missing = 1.0 - self.tokens_available;
        let wait_ms = missing * (1000.0 / self.refill_per_second);
        Err(Duration::from_secs_f64(wait_ms.max(0.0) / 1000.0))
    }
}

pub struct RateLimiter {
    limits: HashMap<String, ProviderLimitConfig>,
    fallback: ProviderLimitConfig,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitsConfig) -> Self {
        let limits = config
            .providers
            .iter()
            .map(|limit| (limit.provider.clone(), limit.clone()))
            .collect();

        Self {
            limits,
            fallback: config.fallback.clone(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with a single explicit provider entry
    pub fn single(limit: ProviderLimitConfig) -> Self {
        Self::new(&RateLimitsConfig {
            providers: vec![limit],
            fallback: ProviderLimitConfig::default(),
        })
    }

    fn limit_for(&self, provider: &str) -> &ProviderLimitConfig {
        self.limits.get(provider).unwrap_or(&self.fallback)
    }

    /// Wait until a token is available for `provider`, then consume it
    pub async fn acquire(&self, provider: &str) {
        let mut waited = Duration::ZERO;

        loop {
            let outcome = {
                let mut buckets = self.buckets.lock();
                let now = Instant::now();
                let bucket = buckets
                    .entry(provider.to_string())
                    .or_insert_with(|| TokenBucket::new(self.limit_for(provider), now));
                bucket.try_take(now)
            };

            match outcome {
                Ok(()) => {
                    if !waited.is_zero() {
                        logger::verbose(
                            LogTag::RateLimit,
                            &format!(
                                "[{}] token acquired after waiting {}ms",
                                provider,
                                waited.as_millis()
                            ),
                        );
                    }
                    return;
                }
                Err(wait) => {
                    if waited.is_zero() {
                        logger::debug(
                            LogTag::RateLimit,
                            &format!(
                                "[{}] bucket empty, waiting {}ms",
                                provider,
                                wait.as_millis()
                            ),
                        );
                    }
                    waited += wait;
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Return one token to `provider`'s bucket (capped at capacity)
    pub fn release(&self, provider: &str) {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(self.limit_for(provider), now));
        bucket.refill(now);
        bucket.tokens_available = (bucket.tokens_available + 1.0).min(bucket.max_tokens);
    }

    /// Tokens currently available for `provider`
    pub fn available(&self, provider: &str) -> f64 {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(self.limit_for(provider), now));
        bucket.refill(now);
        bucket.tokens_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(provider: &str, max: f64, rate: f64, start_full: bool) -> RateLimiter {
        RateLimiter::single(ProviderLimitConfig {
            provider: provider.to_string(),
            max_tokens: max,
            refill_per_second: rate,
            start_full,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_bucket_allows_burst() {
        let limiter = limiter("jupiter", 5.0, 1.0, true);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire("jupiter").await;
        }

        assert!(start.elapsed() < Duration::from_millis(1));
        assert!(limiter.available("jupiter") < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_refill_when_empty() {
        let limiter = limiter("jupiter", 2.0, 2.0, true);
        limiter.acquire("jupiter").await;
        limiter.acquire("jupiter").await;

        let start = Instant::now();
        limiter.acquire("jupiter").await;

        // One token at 2/s takes 500ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_601_calls_at_600_per_minute_take_a_minute() {
        let limiter = RateLimiter::new(&RateLimitsConfig::default());
        let start = Instant::now();

        for _ in 0..601 {
            limiter.acquire("jupiter").await;
        }

        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_buckets_start_empty() {
        let limiter = RateLimiter::new(&RateLimitsConfig::default());
        for provider in ["jupiter", "helius", "dexscreener", "unlisted"] {
            assert_eq!(limiter.available(provider), 0.0, "{}", provider);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_capacity() {
        let limiter = limiter("helius", 3.0, 10.0, false);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.available("helius"), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_returns_a_token() {
        let limiter = limiter("helius", 1.0, 0.1, true);
        limiter.acquire("helius").await;
        assert!(limiter.available("helius") < 1.0);

        limiter.release("helius");
        let start = Instant::now();
        limiter.acquire("helius").await;
        assert!(start.elapsed() < Duration::from_millis(1));

        // Release never overfills
        limiter.release("helius");
        limiter.release("helius");
        assert!(limiter.available("helius") <= 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_have_independent_buckets() {
        let limiter = RateLimiter::new(&RateLimitsConfig {
            providers: vec![
                ProviderLimitConfig::new("jupiter", 1.0, 0.5),
                ProviderLimitConfig::new("dexscreener", 1.0, 0.5),
            ],
            fallback: ProviderLimitConfig::new("default", 4.0, 1.0),
        });

        limiter.acquire("jupiter").await;
        let start = Instant::now();
        limiter.acquire("dexscreener").await;
        assert!(start.elapsed() < Duration::from_millis(1));

        // Unknown providers use the fallback bucket size
        assert_eq!(limiter.available("unlisted"), 4.0);
    }
}
