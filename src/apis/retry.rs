//! Bounded retry with exponential backoff

use crate::config::{HolderConfig, MarketConfig, PriceConfig};
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Cap on the backoff exponent so delays never overflow
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Runs an async operation up to `max_attempts` times
///
/// Delay before retry n (0-based) is `base_delay * 2^n`, capped at `max_delay`,
/// plus up to `jitter * delay` of random slack. Only transient errors are
/// retried; client errors surface immediately. Exhaustion yields
/// `EngineError::Aggregate` wrapping the last error.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl RetryExecutor {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
            jitter: 0.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Jitter as a fraction of the computed delay (clamped to 0..=0.5)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 0.5);
        self
    }

    pub fn for_prices(config: &PriceConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    pub fn for_holders(config: &HolderConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    pub fn for_market(config: &MarketConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT));
        let delay = self.base_delay.saturating_mul(multiplier).min(self.max_delay);

        if self.jitter > 0.0 {
            let slack = delay.as_secs_f64() * self.jitter * rand::thread_rng().gen::<f64>();
            delay + Duration::from_secs_f64(slack)
        } else {
            delay
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or
    /// runs out of attempts
    pub async fn execute<T, F, Fut>(&self, context: &str, mut operation: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut last_error: Option<EngineError> = None;

        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        logger::debug(
                            LogTag::Retry,
                            &format!("{}: succeeded on attempt {}", context, attempt + 1),
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    logger::debug(
                        LogTag::Retry,
                        &format!("{}: not retrying ({})", context, err),
                    );
                    return Err(err);
                }
                Err(err) => {
                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        logger::warning(
                            LogTag::Retry,
                            &format!(
                                "{}: attempt {}/{} failed ({}), retrying in {}ms",
                                context,
                                attempt + 1,
                                self.max_attempts,
                                err,
                                delay.as_millis()
                            ),
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| EngineError::network("no attempt was made"));
        logger::error(
            LogTag::Retry,
            &format!(
                "{}: giving up after {} attempts: {}",
                context, self.max_attempts, last
            ),
        );
        Err(EngineError::aggregate(context, self.max_attempts, last))
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}
