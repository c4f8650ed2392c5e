//! AMM health evaluation
//!
//! Scores the pools trading a token set. Each venue (DEX) gets three
//! component scores in [0, 1]:
//! - liquidity: `min(liquidity / target_liquidity, 1)`
//! - volume: `min(volume_24h / target_volume, 1)`
//! - flow: `1 - |buys - sells| / (buys + sells)` (0 without trades)
//!
//! The venue score is their mean; the set score is the mean over venues.
//! Health is advisory: upstream failures yield no score rather than an error.

use crate::apis::{dedupe, partition, PairProvider, RateLimiter, RetryExecutor, Upstream};
use crate::cache::{token_set_key, CacheConfig, CacheStore};
use crate::config::{CacheSettings, HealthConfig, MarketConfig};
use crate::errors::{EngineResult, HEALTH_FETCH_FAILED};
use crate::events::{EventBus, MarketEvent};
use crate::logger::{self, LogTag};
use crate::types::{AmmHealthScore, HealthReport, PairSnapshot, VenueHealth};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub struct AmmHealthEvaluator {
    pairs: Arc<dyn PairProvider>,
    upstream: Upstream,
    cache: Arc<CacheStore<AmmHealthScore>>,
    config: HealthConfig,
    events: EventBus,
}

impl AmmHealthEvaluator {
    pub fn new(
        pairs: Arc<dyn PairProvider>,
        limiter: Arc<RateLimiter>,
        market_config: &MarketConfig,
        config: &HealthConfig,
        cache: &CacheSettings,
        events: EventBus,
    ) -> Self {
        let upstream = Upstream::new(
            pairs.name(),
            limiter,
            RetryExecutor::for_market(market_config),
        );

        Self {
            pairs,
            upstream,
            cache: Arc::new(CacheStore::new(
                "amm-health",
                CacheConfig::with_settings(cache.health_ttl_secs, cache),
            )),
            config: config.clone(),
            events,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore<AmmHealthScore>> {
        &self.cache
    }

    /// `{ token_set_key: score }`, or an empty map when no score is available
    pub async fn check_health<S: AsRef<str>>(&self, ids: &[S]) -> HashMap<String, f64> {
        self.evaluate(ids)
            .await
            .map(|score| HashMap::from([(score.token_set_key, score.score)]))
            .unwrap_or_default()
    }

    /// Whether the average venue score reaches the threshold
    pub async fn is_healthy<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        let record = self.evaluate(ids).await;
        self.passes(record.as_ref())
    }

    /// Scores map and verdict from a single evaluation
    pub async fn report<S: AsRef<str>>(&self, ids: &[S]) -> HealthReport {
        let record = self.evaluate(ids).await;
        let healthy = self.passes(record.as_ref());
        HealthReport {
            scores: record
                .map(|score| HashMap::from([(score.token_set_key, score.score)]))
                .unwrap_or_default(),
            healthy,
            threshold: self.config.threshold,
        }
    }

    fn passes(&self, record: Option<&AmmHealthScore>) -> bool {
        record.map_or(false, |score| score.score >= self.config.threshold)
    }

    /// Full health record for the token set
    pub async fn evaluate<S: AsRef<str>>(&self, ids: &[S]) -> Option<AmmHealthScore> {
        let ids = dedupe(ids);
        if ids.is_empty() {
            return None;
        }

        let key = token_set_key(&ids);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let pairs = match self.fetch_pairs(&ids).await {
            Ok(pairs) => pairs,
            Err(err) => {
                logger::warning(
                    LogTag::Health,
                    &format!("Health check for [{}] skipped: {}", key, err),
                );
                return None;
            }
        };

        let venues = venue_health(&pairs, &ids, &self.config);
        if venues.is_empty() {
            logger::debug(
                LogTag::Health,
                &format!("No venues trade [{}], no health score", key),
            );
            return None;
        }

        let score = venues.iter().map(|v| v.score).sum::<f64>() / venues.len() as f64;
        let record = AmmHealthScore {
            token_set_key: key.clone(),
            score: score.clamp(0.0, 1.0),
            venues,
            timestamp: Utc::now(),
        };

        logger::debug(
            LogTag::Health,
            &format!(
                "[{}] health {:.3} over {} venues (threshold {})",
                key,
                record.score,
                record.venues.len(),
                self.config.threshold
            ),
        );

        self.cache.set(key.clone(), record.clone());
        self.events.publish(MarketEvent::HealthEvaluated {
            token_set_key: key,
            score: record.score,
        });

        Some(record)
    }

    async fn fetch_pairs(&self, ids: &[String]) -> EngineResult<Vec<PairSnapshot>> {
        let mut pairs = Vec::new();
        for batch in partition(ids, self.pairs.max_tokens_per_request()) {
            let fetched = self
                .upstream
                .call(HEALTH_FETCH_FAILED, || self.pairs.fetch_pairs(&batch))
                .await?;
            pairs.extend(fetched);
        }
        Ok(pairs)
    }
}

/// Per-venue health over the pools that trade any of `ids`
pub fn venue_health(pairs: &[PairSnapshot], ids: &[String], config: &HealthConfig) -> Vec<VenueHealth> {
    #[derive(Default)]
    struct VenueTotals {
        liquidity: f64,
        volume: f64,
        buys: u64,
        sells: u64,
    }

    let wanted: HashSet<&str> = ids.iter().map(|id| id.as_str()).collect();
    let mut seen_pairs = HashSet::new();
    let mut by_venue: BTreeMap<&str, VenueTotals> = BTreeMap::new();

    for pair in pairs {
        let relevant = wanted.contains(pair.base_token.as_str())
            || wanted.contains(pair.quote_token.as_str());
        // Batched lookups can return the same pool twice
        if !relevant || !seen_pairs.insert(pair.pair_address.as_str()) {
            continue;
        }

        let totals = by_venue.entry(pair.venue.as_str()).or_default();
        totals.liquidity += pair.liquidity_usd;
        totals.volume += pair.volume_24h_usd;
        totals.buys += pair.buys_24h;
        totals.sells += pair.sells_24h;
    }

    by_venue
        .into_iter()
        .map(|(venue, totals)| {
            let liquidity_score = saturating_ratio(totals.liquidity, config.target_liquidity_usd);
            let volume_score = saturating_ratio(totals.volume, config.target_volume_usd);
            let flow_score = flow_balance(totals.buys, totals.sells);
            let score = ((liquidity_score + volume_score + flow_score) / 3.0).clamp(0.0, 1.0);

            VenueHealth {
                venue: venue.to_string(),
                liquidity_usd: totals.liquidity,
                volume_24h_usd: totals.volume,
                liquidity_score,
                volume_score,
                flow_score,
                score,
            }
        })
        .collect()
}

fn saturating_ratio(value: f64, target: f64) -> f64 {
    if !(target > 0.0) || !(value > 0.0) {
        return 0.0;
    }
    (value / target).min(1.0)
}

/// 1 for perfectly two-sided flow, 0 for one-sided or no trades
fn flow_balance(buys: u64, sells: u64) -> f64 {
    let total = buys + sells;
    if total == 0 {
        return 0.0;
    }
    1.0 - (buys as f64 - sells as f64).abs() / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderLimitConfig, RateLimitsConfig};
    use crate::errors::{EngineError, EngineResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockPairs {
        pairs: Vec<PairSnapshot>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockPairs {
        fn new(pairs: Vec<PairSnapshot>) -> Self {
            Self {
                pairs,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PairProvider for MockPairs {
        fn name(&self) -> &str {
            "mock-pairs"
        }

        async fn fetch_pairs(&self, _token_ids: &[String]) -> EngineResult<Vec<PairSnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EngineError::network("pairs down"));
            }
            Ok(self.pairs.clone())
        }
    }

    fn pool(venue: &str, liquidity: f64, volume: f64, buys: u64, sells: u64) -> PairSnapshot {
        PairSnapshot {
            venue: venue.to_string(),
            pair_address: format!("{}-pool", venue),
            base_token: "BONK".to_string(),
            quote_token: "SOL".to_string(),
            liquidity_usd: liquidity,
            volume_24h_usd: volume,
            buys_24h: buys,
            sells_24h: sells,
        }
    }

    fn evaluator(pairs: Arc<MockPairs>) -> AmmHealthEvaluator {
        let limiter = Arc::new(RateLimiter::new(&RateLimitsConfig {
            providers: vec![],
            fallback: ProviderLimitConfig::new("default", 1_000.0, 1_000.0),
        }));
        AmmHealthEvaluator::new(
            pairs,
            limiter,
            &MarketConfig {
                retry_base_delay_ms: 1,
                ..MarketConfig::default()
            },
            &HealthConfig::default(),
            &CacheSettings::default(),
            EventBus::new(16),
        )
    }

    #[tokio::test]
    async fn test_healthy_venues_pass() {
        let pairs = Arc::new(MockPairs::new(vec![
            pool("raydium", 250_000.0, 90_000.0, 500, 500),
            pool("orca", 150_000.0, 60_000.0, 400, 400),
        ]));
        let evaluator = evaluator(pairs);

        assert!(evaluator.is_healthy(&["SOL", "BONK"]).await);
        let health = evaluator.check_health(&["BONK", "SOL"]).await;
        assert_eq!(health.get("BONK,SOL"), Some(&1.0));
    }

    #[tokio::test]
    async fn test_average_below_threshold_is_unhealthy_despite_one_good_venue() {
        let pairs = Arc::new(MockPairs::new(vec![
            pool("raydium", 250_000.0, 90_000.0, 500, 500),
            pool("tiny", 10_000.0, 5_000.0, 10, 0),
        ]));
        let evaluator = evaluator(pairs);

        let record = evaluator.evaluate(&["BONK"]).await.unwrap();
        let best = record
            .venues
            .iter()
            .map(|v| v.score)
            .fold(0.0, f64::max);

        assert!(best >= 0.8);
        assert!(record.score < 0.8);
        assert!(!evaluator.is_healthy(&["BONK"]).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_failure_yields_empty_map() {
        let mut mock = MockPairs::new(vec![]);
        mock.fail = true;
        let evaluator = evaluator(Arc::new(mock));

        assert!(evaluator.check_health(&["BONK"]).await.is_empty());
        assert!(!evaluator.is_healthy(&["BONK"]).await);
        assert!(evaluator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_no_venues_is_not_cached() {
        let pairs = Arc::new(MockPairs::new(vec![]));
        let evaluator = evaluator(pairs.clone());

        assert!(evaluator.evaluate(&["BONK"]).await.is_none());
        assert!(evaluator.evaluate(&["BONK"]).await.is_none());
        assert_eq!(pairs.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_report_evaluates_once_without_a_score() {
        let pairs = Arc::new(MockPairs::new(vec![]));
        let evaluator = evaluator(pairs.clone());

        let report = evaluator.report(&["BONK"]).await;

        assert!(report.scores.is_empty());
        assert!(!report.healthy);
        assert_eq!(report.threshold, 0.8);
        assert_eq!(pairs.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_carries_score_and_verdict() {
        let pairs = Arc::new(MockPairs::new(vec![pool("raydium", 250_000.0, 90_000.0, 500, 500)]));
        let evaluator = evaluator(pairs.clone());

        let report = evaluator.report(&["SOL", "BONK"]).await;

        assert_eq!(report.scores.get("BONK,SOL"), Some(&1.0));
        assert!(report.healthy);
        assert_eq!(pairs.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scores_are_cached_per_token_set() {
        let pairs = Arc::new(MockPairs::new(vec![pool("raydium", 1.0, 1.0, 1, 1)]));
        let evaluator = evaluator(pairs.clone());

        evaluator.evaluate(&["SOL", "BONK"]).await.unwrap();
        evaluator.evaluate(&["BONK", "SOL", "BONK"]).await.unwrap();

        assert_eq!(pairs.calls.load(Ordering::SeqCst), 1);
        assert!(evaluator.cache().has("BONK,SOL"));
    }

    #[test]
    fn test_venue_scores() {
        let config = HealthConfig::default();
        let ids = vec!["BONK".to_string()];
        let mut unrelated = pool("meteora", 1e9, 1e9, 1, 1);
        unrelated.base_token = "OTHER".to_string();

        let venues = venue_health(
            &[
                pool("raydium", 50_000.0, 50_000.0, 30, 10),
                unrelated,
            ],
            &ids,
            &config,
        );

        assert_eq!(venues.len(), 1);
        let raydium = &venues[0];
        assert_eq!(raydium.liquidity_score, 0.5);
        assert_eq!(raydium.volume_score, 1.0);
        assert_eq!(raydium.flow_score, 0.5);
        assert!((raydium.score - 2.0 / 3.0).abs() < 1e-12);
    }
}
