//! Price aggregation service
//!
//! Turns a list of token ids into confidence-filtered quotes:
//! 1. Dedupe ids, partition into provider-sized batches
//! 2. Per batch: cache lookup under `prices:<sorted ids>`, else rate-limited,
//!    retried upstream fetch
//! 3. Drop quotes below the confidence threshold or without a usable price
//! 4. Cache the surviving batch, merge every batch into one ordered map
//!
//! A complete merged result is also kept for a few seconds under the request's
//! id set, and each surviving quote under its id for `get_price`.
//!
//! Batches run concurrently; a batch that fails after retries is reported and
//! skipped. Only when every batch fails does the call fail.

use crate::apis::{dedupe, partition, PriceProvider, RateLimiter, RetryExecutor, Upstream};
use crate::cache::{token_set_key, CacheConfig, CacheStore};
use crate::config::{CacheSettings, PriceConfig};
use crate::errors::{EngineError, EngineResult, PRICE_FETCH_FAILED};
use crate::events::{EventBus, MarketEvent};
use crate::logger::{self, LogTag};
use crate::types::{PriceMap, PriceQuote, RawQuote};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A batch that could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedBatch {
    pub ids: Vec<String>,
    pub error: String,
}

/// Quotes plus the batches that failed (their ids are absent from `quotes`)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceFetchReport {
    pub quotes: PriceMap,
    pub failed_batches: Vec<FailedBatch>,
}

impl PriceFetchReport {
    pub fn is_partial(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}

pub struct PriceAggregationService {
    provider: Arc<dyn PriceProvider>,
    upstream: Upstream,
    /// Filtered batches keyed by `prices:<sorted ids>`
    batch_cache: Arc<CacheStore<PriceMap>>,
    /// Merged results keyed by the request's sorted id set
    price_cache: Arc<CacheStore<PriceMap>>,
    /// Individual quotes for single-id lookups
    quote_cache: Arc<CacheStore<PriceQuote>>,
    batch_size: usize,
    confidence_threshold: f64,
    events: EventBus,
}

impl PriceAggregationService {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        limiter: Arc<RateLimiter>,
        config: &PriceConfig,
        cache: &CacheSettings,
        events: EventBus,
    ) -> Self {
        let upstream = Upstream::new(provider.name(), limiter, RetryExecutor::for_prices(config));

        Self {
            provider,
            upstream,
            batch_cache: Arc::new(CacheStore::new(
                "price-batches",
                CacheConfig::with_settings(cache.price_batch_ttl_secs, cache),
            )),
            price_cache: Arc::new(CacheStore::new(
                "prices",
                CacheConfig::with_settings(cache.price_ttl_secs, cache),
            )),
            quote_cache: Arc::new(CacheStore::new(
                "quotes",
                CacheConfig::with_settings(cache.quote_ttl_secs, cache),
            )),
            batch_size: config.batch_size.max(1),
            confidence_threshold: config.confidence_threshold,
            events,
        }
    }

    pub fn batch_cache(&self) -> &Arc<CacheStore<PriceMap>> {
        &self.batch_cache
    }

    pub fn price_cache(&self) -> &Arc<CacheStore<PriceMap>> {
        &self.price_cache
    }

    pub fn quote_cache(&self) -> &Arc<CacheStore<PriceQuote>> {
        &self.quote_cache
    }

    /// Confidence-filtered quotes for `ids`
    ///
    /// Ids without a confident quote are simply absent. Failed batches are
    /// logged; the call fails only if no batch succeeded.
    pub async fn get_prices<S: AsRef<str>>(&self, ids: &[S]) -> EngineResult<PriceMap> {
        let report = self.get_prices_detailed(ids).await?;

        for failed in &report.failed_batches {
            logger::warning(
                LogTag::PriceService,
                &format!(
                    "Returning partial prices: batch of {} ids failed: {}",
                    failed.ids.len(),
                    failed.error
                ),
            );
        }

        Ok(report.quotes)
    }

    /// Like `get_prices`, but also reports which batches failed
    pub async fn get_prices_detailed<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> EngineResult<PriceFetchReport> {
        let ids = dedupe(ids);
        if ids.is_empty() {
            return Err(EngineError::validation(
                "price request requires at least one token id",
            ));
        }

        let request_key = token_set_key(&ids);
        if let Some(quotes) = self.price_cache.get(&request_key) {
            logger::debug(
                LogTag::PriceService,
                &format!("Serving {} ids from the price cache", ids.len()),
            );
            return Ok(PriceFetchReport {
                quotes,
                failed_batches: Vec::new(),
            });
        }

        let batches = partition(&ids, self.batch_size);
        let batch_count = batches.len();
        logger::debug(
            LogTag::PriceService,
            &format!(
                "Fetching {} ids in {} batches of up to {}",
                ids.len(),
                batch_count,
                self.batch_size
            ),
        );

        let results = join_all(batches.into_iter().map(|batch| async move {
            let result = self.fetch_batch(&batch).await;
            (batch, result)
        }))
        .await;

        let mut report = PriceFetchReport::default();
        let mut last_error: Option<EngineError> = None;

        for (batch, result) in results {
            match result {
                Ok(quotes) => report.quotes.extend(quotes),
                Err(err) => {
                    self.events.publish(MarketEvent::BatchFailed {
                        provider: self.provider.name().to_string(),
                        ids: batch.clone(),
                        error: err.to_string(),
                    });
                    report.failed_batches.push(FailedBatch {
                        ids: batch,
                        error: err.to_string(),
                    });
                    last_error = Some(err);
                }
            }
        }

        if report.failed_batches.len() == batch_count {
            let err = last_error.unwrap_or_else(|| EngineError::network("no batch was fetched"));
            logger::error(
                LogTag::PriceService,
                &format!("All {} price batches failed: {}", batch_count, err),
            );
            let exhausted = err.context() == Some(PRICE_FETCH_FAILED);
            return Err(if exhausted {
                err
            } else {
                EngineError::aggregate(PRICE_FETCH_FAILED, 1, err)
            });
        }

        // Partial results are not worth pinning, the next call may recover them
        if !report.is_partial() {
            self.price_cache.set(request_key, report.quotes.clone());
        }

        logger::debug(
            LogTag::PriceService,
            &format!(
                "Resolved {}/{} ids ({} failed batches)",
                report.quotes.len(),
                ids.len(),
                report.failed_batches.len()
            ),
        );

        Ok(report)
    }

    /// Single-id lookup served from the short-lived quote cache when fresh
    pub async fn get_price(&self, id: &str) -> EngineResult<Option<PriceQuote>> {
        if let Some(quote) = self.quote_cache.get(id) {
            return Ok(Some(quote));
        }

        let quotes = self.get_prices(&[id]).await?;
        Ok(quotes.get(id).cloned())
    }

    async fn fetch_batch(&self, batch: &[String]) -> EngineResult<PriceMap> {
        let key = format!("prices:{}", token_set_key(batch));

        self.batch_cache
            .get_or_set(&key, || async {
                let raw = self
                    .upstream
                    .call(PRICE_FETCH_FAILED, || self.provider.fetch_prices(batch))
                    .await?;

                let quotes = self.filter_quotes(raw, batch);
                for quote in quotes.values() {
                    self.quote_cache.set(quote.id.clone(), quote.clone());
                }

                self.events.publish(MarketEvent::PricesUpdated {
                    ids: batch.to_vec(),
                    count: quotes.len(),
                });

                Ok::<_, EngineError>(quotes)
            })
            .await
    }

    /// Keep requested ids with a positive price and sufficient confidence
    fn filter_quotes(&self, raw: Vec<RawQuote>, batch: &[String]) -> PriceMap {
        let requested: HashSet<&str> = batch.iter().map(|id| id.as_str()).collect();
        let received = raw.len();

        let quotes: PriceMap = raw
            .iter()
            .filter(|quote| requested.contains(quote.id.as_str()))
            .filter_map(|quote| PriceQuote::from_raw(quote, self.confidence_threshold))
            .map(|quote| (quote.id.clone(), quote))
            .collect();

        if quotes.len() < received {
            logger::debug(
                LogTag::PriceService,
                &format!(
                    "Dropped {} of {} quotes (confidence < {} or no usable price)",
                    received - quotes.len(),
                    received,
                    self.confidence_threshold
                ),
            );
        }

        quotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderLimitConfig, RateLimitsConfig};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    type QuoteFn = dyn Fn(&str) -> RawQuote + Send + Sync;

    /// In-memory provider that records every batch it is asked for
    struct MockPriceProvider {
        quote: Box<QuoteFn>,
        fail_when_batch_contains: Option<String>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl MockPriceProvider {
        fn confident() -> Self {
            Self::with_quotes(|id| RawQuote {
                id: id.to_string(),
                price: Some(1.5),
                confidence: Some(0.9),
            })
        }

        fn with_quotes(quote: impl Fn(&str) -> RawQuote + Send + Sync + 'static) -> Self {
            Self {
                quote: Box::new(quote),
                fail_when_batch_contains: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, id: &str) -> Self {
            self.fail_when_batch_contains = Some(id.to_string());
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn batch_sizes(&self) -> Vec<usize> {
            let mut sizes: Vec<usize> = self.calls.lock().iter().map(|b| b.len()).collect();
            sizes.sort_unstable();
            sizes
        }
    }

    #[async_trait]
    impl PriceProvider for MockPriceProvider {
        fn name(&self) -> &str {
            "mock-prices"
        }

        async fn fetch_prices(&self, ids: &[String]) -> EngineResult<Vec<RawQuote>> {
            self.calls.lock().push(ids.to_vec());
            if let Some(poison) = &self.fail_when_batch_contains {
                if ids.contains(poison) {
                    return Err(EngineError::network("connection reset by peer"));
                }
            }
            Ok(ids.iter().map(|id| (self.quote)(id)).collect())
        }
    }

    fn service(provider: Arc<MockPriceProvider>, batch_size: usize) -> PriceAggregationService {
        let limiter = Arc::new(RateLimiter::new(&RateLimitsConfig {
            providers: vec![ProviderLimitConfig::new("mock-prices", 1000.0, 1000.0)],
            fallback: ProviderLimitConfig::default(),
        }));
        let config = PriceConfig {
            batch_size,
            retry_base_delay_ms: 10,
            ..PriceConfig::default()
        };
        PriceAggregationService::new(
            provider,
            limiter,
            &config,
            &CacheSettings::default(),
            EventBus::new(16),
        )
    }

    fn token_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("token-{:03}", i)).collect()
    }

    #[tokio::test]
    async fn test_250_ids_make_three_upstream_calls() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);

        let prices = service.get_prices(&token_ids(250)).await.unwrap();

        assert_eq!(prices.len(), 250);
        assert_eq!(provider.batch_sizes(), vec![50, 100, 100]);
    }

    #[tokio::test]
    async fn test_repeat_call_is_served_from_cache() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);
        let ids = token_ids(250);

        let first = service.get_prices(&ids).await.unwrap();
        let calls_after_first = provider.call_count();
        let second = service.get_prices(&ids).await.unwrap();

        assert_eq!(provider.call_count(), calls_after_first);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_request_is_rebuilt_from_batch_cache() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);
        let ids = token_ids(150);

        service.get_prices(&ids).await.unwrap();
        service.get_prices(&ids).await.unwrap();
        assert_eq!(service.price_cache().metrics().hits, 1);

        // Past the 5s request TTL, well inside the 300s batch TTL
        tokio::time::advance(std::time::Duration::from_secs(10)).await;
        let prices = service.get_prices(&ids).await.unwrap();

        assert_eq!(prices.len(), 150);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(service.batch_cache().metrics().hits, 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_fetched_once() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);

        let prices = service.get_prices(&["SOL", "SOL", "BONK"]).await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(provider.batch_sizes(), vec![2]);
    }

    #[tokio::test]
    async fn test_low_confidence_quotes_are_dropped() {
        let provider = Arc::new(MockPriceProvider::with_quotes(|id| RawQuote {
            id: id.to_string(),
            price: if id == "NOPRICE" { None } else { Some(2.0) },
            confidence: Some(if id == "LOW" { 0.2 } else { 0.9 }),
        }));
        let service = service(provider, 100);

        let prices = service
            .get_prices(&["LOW", "HIGH", "NOPRICE"])
            .await
            .unwrap();

        assert!(!prices.contains_key("LOW"));
        assert!(!prices.contains_key("NOPRICE"));
        assert_eq!(prices["HIGH"].confidence, 0.9);

        // Dropped ids are never cached either
        assert!(!service.quote_cache().has("LOW"));
        assert!(service.quote_cache().has("HIGH"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_is_an_aggregate_error() {
        let provider = Arc::new(MockPriceProvider::confident().failing_on("SOL"));
        let service = service(provider.clone(), 100);

        let err = service.get_prices(&["SOL", "BONK"]).await.unwrap_err();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(err.context(), Some(PRICE_FETCH_FAILED));
        assert!(err.to_string().starts_with("Failed to fetch prices"));
        assert!(service.batch_cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_returns_successful_batches() {
        let provider = Arc::new(MockPriceProvider::confident().failing_on("C"));
        let service = service(provider, 2);

        let report = service.get_prices_detailed(&["A", "B", "C"]).await.unwrap();

        assert_eq!(report.quotes.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(report.is_partial());
        assert_eq!(report.failed_batches[0].ids, vec!["C".to_string()]);
        assert!(service.price_cache().is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_is_a_validation_error() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);

        let err = service.get_prices::<String>(&[]).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_price_uses_quote_cache() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider.clone(), 100);

        service.get_prices(&["SOL", "BONK"]).await.unwrap();
        let quote = service.get_price("SOL").await.unwrap();

        assert_eq!(quote.map(|q| q.price), Some(1.5));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fresh_batches_publish_events() {
        let provider = Arc::new(MockPriceProvider::confident());
        let service = service(provider, 100);
        let mut events = service.events.subscribe();

        service.get_prices(&["SOL"]).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            MarketEvent::PricesUpdated {
                ids: vec!["SOL".to_string()],
                count: 1,
            }
        );
    }
}
