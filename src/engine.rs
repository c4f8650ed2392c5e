/// Market-data engine: composition root
///
/// Builds every component from `EngineConfig` and owns their lifecycle:
/// - one shared `RateLimiter` (buckets per provider)
/// - one `EventBus`
/// - the price, metrics and health services with their own caches
/// - the background cache sweepers (`start` / `shutdown`)
use crate::amm::AmmHealthEvaluator;
use crate::apis::{
    DexScreenerClient, HeliusClient, HolderProvider, JupiterPriceClient, PairProvider,
    PriceProvider, RateLimiter,
};
use crate::config::{utils::validate_config, EngineConfig};
use crate::errors::EngineResult;
use crate::events::EventBus;
use crate::logger::{self, LogTag};
use crate::market::MarketMetricsAnalyzer;
use crate::pricing::PriceAggregationService;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct MarketDataEngine {
    config: EngineConfig,
    limiter: Arc<RateLimiter>,
    events: EventBus,
    prices: Arc<PriceAggregationService>,
    metrics: Arc<MarketMetricsAnalyzer>,
    health: Arc<AmmHealthEvaluator>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

impl MarketDataEngine {
    /// Engine backed by the configured HTTP providers
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        validate_config(&config)?;

        let price_provider: Arc<dyn PriceProvider> = Arc::new(JupiterPriceClient::new(&config.price)?);
        let holder_provider: Arc<dyn HolderProvider> = Arc::new(HeliusClient::new(&config.holders)?);
        let pair_provider: Arc<dyn PairProvider> = Arc::new(DexScreenerClient::new(&config.market)?);

        Ok(Self::with_providers(
            config,
            price_provider,
            holder_provider,
            pair_provider,
        ))
    }

    /// Engine over caller-supplied providers
    pub fn with_providers(
        config: EngineConfig,
        price_provider: Arc<dyn PriceProvider>,
        holder_provider: Arc<dyn HolderProvider>,
        pair_provider: Arc<dyn PairProvider>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limits));
        let events = EventBus::new(config.events.channel_capacity);

        let prices = Arc::new(PriceAggregationService::new(
            price_provider,
            limiter.clone(),
            &config.price,
            &config.cache,
            events.clone(),
        ));
        let metrics = Arc::new(MarketMetricsAnalyzer::new(
            holder_provider,
            pair_provider.clone(),
            limiter.clone(),
            &config.holders,
            &config.market,
            &config.cache,
            events.clone(),
        ));
        let health = Arc::new(AmmHealthEvaluator::new(
            pair_provider,
            limiter.clone(),
            &config.market,
            &config.health,
            &config.cache,
            events.clone(),
        ));

        Self {
            config,
            limiter,
            events,
            prices,
            metrics,
            health,
            sweepers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the cache sweepers (no-op if already running)
    pub fn start(&self) {
        let mut sweepers = self.sweepers.lock();
        if !sweepers.is_empty() {
            return;
        }

        let interval = Duration::from_secs(self.config.cache.sweep_interval_secs.max(1));
        sweepers.push(self.prices.batch_cache().spawn_sweeper(interval));
        sweepers.push(self.prices.price_cache().spawn_sweeper(interval));
        sweepers.push(self.prices.quote_cache().spawn_sweeper(interval));
        sweepers.push(self.metrics.metadata_cache().spawn_sweeper(interval));
        sweepers.push(self.metrics.market_cache().spawn_sweeper(interval));
        sweepers.push(self.health.cache().spawn_sweeper(interval));

        logger::info(
            LogTag::System,
            &format!(
                "Market engine started ({} cache sweepers every {}s)",
                sweepers.len(),
                interval.as_secs()
            ),
        );
    }

    /// Stop the cache sweepers; in-flight requests are not cancelled
    pub fn shutdown(&self) {
        let mut sweepers = self.sweepers.lock();
        if sweepers.is_empty() {
            return;
        }
        for handle in sweepers.drain(..) {
            handle.abort();
        }
        logger::info(LogTag::System, "Market engine stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.sweepers.lock().is_empty()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn prices(&self) -> &Arc<PriceAggregationService> {
        &self.prices
    }

    pub fn metrics(&self) -> &Arc<MarketMetricsAnalyzer> {
        &self.metrics
    }

    pub fn health(&self) -> &Arc<AmmHealthEvaluator> {
        &self.health
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl Drop for MarketDataEngine {
    fn drop(&mut self) {
        for handle in self.sweepers.get_mut().drain(..) {
            handle.abort();
        }
    }
}
