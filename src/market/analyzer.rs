/// Market metrics for a single mint
///
/// Flow:
/// 1. Supply/decimals (token metadata cache)
/// 2. Paginated holder accounts, summed per owner
/// 3. Owner classification: config rules, then batched upstream lookups
/// 4. Supply breakdown, distribution statistics
/// 5. Volume and liquidity from the pair provider
///
/// The finished `MarketMetrics` is cached per mint for the market TTL.
use super::classification::ClassificationRules;
use super::distribution::distribution_metrics;
use crate::apis::{partition, HolderProvider, PairProvider, RateLimiter, RetryExecutor, Upstream};
use crate::cache::{CacheConfig, CacheStore};
use crate::config::{CacheSettings, HolderConfig, MarketConfig};
use crate::errors::{EngineError, EngineResult, METRICS_FETCH_FAILED};
use crate::events::{EventBus, MarketEvent};
use crate::logger::{self, LogTag};
use crate::types::{
    HolderClass, HolderRecord, LiquidityMetrics, MarketMetrics, MintSupply, PairSnapshot,
    PoolLiquidity, SupplyMetrics, VolumeMetrics,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct MarketMetricsAnalyzer {
    holders: Arc<dyn HolderProvider>,
    pairs: Arc<dyn PairProvider>,
    holder_upstream: Upstream,
    pair_upstream: Upstream,
    rules: ClassificationRules,
    page_limit: u32,
    max_pages: u32,
    classification_batch_size: usize,
    metadata_cache: Arc<CacheStore<MintSupply>>,
    market_cache: Arc<CacheStore<MarketMetrics>>,
    events: EventBus,
}

impl MarketMetricsAnalyzer {
    pub fn new(
        holders: Arc<dyn HolderProvider>,
        pairs: Arc<dyn PairProvider>,
        limiter: Arc<RateLimiter>,
        holder_config: &HolderConfig,
        market_config: &MarketConfig,
        cache: &CacheSettings,
        events: EventBus,
    ) -> Self {
        let holder_upstream = Upstream::new(
            holders.name(),
            limiter.clone(),
            RetryExecutor::for_holders(holder_config),
        );
        let pair_upstream = Upstream::new(
            pairs.name(),
            limiter,
            RetryExecutor::for_market(market_config),
        );

        Self {
            holders,
            pairs,
            holder_upstream,
            pair_upstream,
            rules: ClassificationRules::from_config(holder_config),
            page_limit: holder_config.page_limit.max(1),
            max_pages: holder_config.max_pages.max(1),
            classification_batch_size: holder_config.classification_batch_size.max(1),
            metadata_cache: Arc::new(CacheStore::new(
                "token-metadata",
                CacheConfig::with_settings(cache.token_metadata_ttl_secs, cache),
            )),
            market_cache: Arc::new(CacheStore::new(
                "market",
                CacheConfig::with_settings(cache.market_ttl_secs, cache),
            )),
            events,
        }
    }

    pub fn metadata_cache(&self) -> &Arc<CacheStore<MintSupply>> {
        &self.metadata_cache
    }

    pub fn market_cache(&self) -> &Arc<CacheStore<MarketMetrics>> {
        &self.market_cache
    }

    /// Supply, distribution, volume and liquidity metrics for `mint`
    pub async fn compute_metrics(&self, mint: &str) -> EngineResult<MarketMetrics> {
        let mint = mint.trim();
        if mint.is_empty() {
            return Err(EngineError::validation("market metrics require a mint id"));
        }

        self.market_cache
            .get_or_set(&format!("metrics:{}", mint), || async {
                let metrics = self.compute_uncached(mint).await.map_err(metrics_failure)?;
                self.events.publish(MarketEvent::MetricsComputed {
                    mint: mint.to_string(),
                });
                Ok::<_, EngineError>(metrics)
            })
            .await
    }

    async fn compute_uncached(&self, mint: &str) -> EngineResult<MarketMetrics> {
        logger::debug(LogTag::Metrics, &format!("Computing market metrics for {}", mint));

        let supply = self.mint_supply(mint).await?;
        let balances = self.collect_balances(mint, supply.decimals).await?;
        let classes = self.classify_owners(balances.keys()).await;

        let holders: Vec<HolderRecord> = balances
            .into_iter()
            .map(|(owner, balance)| {
                let classification = classes.get(&owner).copied().unwrap_or(HolderClass::Unknown);
                HolderRecord {
                    owner,
                    balance,
                    classification,
                }
            })
            .collect();

        let supply_metrics = self.supply_metrics(&supply, &holders);
        let distribution = distribution_metrics(&holders);
        let (volume, liquidity) = self.activity(mint).await;

        logger::info(
            LogTag::Metrics,
            &format!(
                "{}: {} holders, gini {:.3}, top10 {:.1}%, 24h volume ${:.0}, liquidity ${:.0}",
                mint,
                distribution.holder_count,
                distribution.gini_coefficient,
                distribution.top_10_concentration,
                volume.total_24h,
                liquidity.total_usd
            ),
        );

        Ok(MarketMetrics {
            mint: mint.to_string(),
            supply: supply_metrics,
            distribution,
            volume,
            liquidity,
            computed_at: Utc::now(),
        })
    }

    async fn mint_supply(&self, mint: &str) -> EngineResult<MintSupply> {
        self.metadata_cache
            .get_or_set(&format!("supply:{}", mint), || {
                self.holder_upstream
                    .call(METRICS_FETCH_FAILED, || self.holders.fetch_mint_supply(mint))
            })
            .await
    }

    /// Owner → UI balance, summed over every token account the owner holds
    async fn collect_balances(
        &self,
        mint: &str,
        decimals: u8,
    ) -> EngineResult<BTreeMap<String, f64>> {
        let mut raw_by_owner: BTreeMap<String, u128> = BTreeMap::new();
        let mut accounts_seen = 0usize;

        for page in 1..=self.max_pages {
            let accounts = self
                .holder_upstream
                .call(METRICS_FETCH_FAILED, || {
                    self.holders.fetch_token_accounts(mint, page, self.page_limit)
                })
                .await?;

            if accounts.is_empty() {
                break;
            }

            accounts_seen += accounts.len();
            for account in accounts {
                if account.amount > 0 {
                    *raw_by_owner.entry(account.owner).or_default() += account.amount as u128;
                }
            }

            if page == self.max_pages {
                logger::warning(
                    LogTag::Metrics,
                    &format!(
                        "{}: stopped holder pagination at the {} page cap; distribution is partial",
                        mint, self.max_pages
                    ),
                );
            }
        }

        logger::debug(
            LogTag::Metrics,
            &format!(
                "{}: {} token accounts across {} owners",
                mint,
                accounts_seen,
                raw_by_owner.len()
            ),
        );

        let scale = 10f64.powi(decimals as i32);
        Ok(raw_by_owner
            .into_iter()
            .map(|(owner, raw)| (owner, raw as f64 / scale))
            .collect())
    }

    /// Class per owner; lookup failures degrade to `Unknown`
    async fn classify_owners<'a>(
        &self,
        owners: impl Iterator<Item = &'a String>,
    ) -> HashMap<String, HolderClass> {
        let owners: Vec<&String> = owners.collect();
        let mut classes: HashMap<String, HolderClass> = owners
            .iter()
            .filter_map(|owner| {
                self.rules
                    .local_class(owner)
                    .map(|class| ((*owner).clone(), class))
            })
            .collect();

        let pending = self.rules.needs_lookup(owners.iter().copied());
        for batch in partition(&pending, self.classification_batch_size) {
            let result = self
                .holder_upstream
                .call(METRICS_FETCH_FAILED, || self.holders.fetch_owner_classes(&batch))
                .await;

            match result {
                Ok(found) => {
                    for owner in batch {
                        let class = found.get(&owner).copied().unwrap_or(HolderClass::Unknown);
                        classes.insert(owner, class);
                    }
                }
                Err(err) => {
                    logger::warning(
                        LogTag::Metrics,
                        &format!(
                            "Classification of {} owners failed, marking them unknown: {}",
                            batch.len(),
                            err
                        ),
                    );
                    for owner in batch {
                        classes.insert(owner, HolderClass::Unknown);
                    }
                }
            }
        }

        classes
    }

    /// Circulating is the sum of holder balances outside burn and lock addresses
    fn supply_metrics(&self, supply: &MintSupply, holders: &[HolderRecord]) -> SupplyMetrics {
        let mut burned = 0.0;
        let mut locked = 0.0;
        let mut circulating = 0.0;
        for holder in holders {
            if self.rules.is_burn(&holder.owner) {
                burned += holder.balance;
            } else if self.rules.is_locked(&holder.owner) {
                locked += holder.balance;
            } else {
                circulating += holder.balance;
            }
        }

        SupplyMetrics {
            total: supply.total_supply,
            circulating,
            locked,
            burned,
            decimals: supply.decimals,
        }
    }

    /// Volume and liquidity; a failing pair provider yields empty metrics
    async fn activity(&self, mint: &str) -> (VolumeMetrics, LiquidityMetrics) {
        let ids = vec![mint.to_string()];
        let result = self
            .pair_upstream
            .call(METRICS_FETCH_FAILED, || self.pairs.fetch_pairs(&ids))
            .await;

        match result {
            Ok(pairs) => activity_metrics(mint, &pairs),
            Err(err) => {
                logger::warning(
                    LogTag::Metrics,
                    &format!("{}: pair data unavailable, volume/liquidity empty: {}", mint, err),
                );
                (VolumeMetrics::default(), LiquidityMetrics::default())
            }
        }
    }
}

/// Keep the metrics context on every failure that leaves the analyzer
fn metrics_failure(err: EngineError) -> EngineError {
    match err {
        EngineError::Validation(_) => err,
        err if err.context() == Some(METRICS_FETCH_FAILED) => err,
        err => EngineError::aggregate(METRICS_FETCH_FAILED, 1, err),
    }
}

/// Volume and liquidity over the pools that trade `mint`
///
/// Buy/sell volume is split by transaction counts. Pools where `mint` is the
/// quote side count base-token sells as buys of `mint`.
pub fn activity_metrics(mint: &str, pairs: &[PairSnapshot]) -> (VolumeMetrics, LiquidityMetrics) {
    let mut volume = VolumeMetrics::default();
    let mut liquidity = LiquidityMetrics::default();

    for pair in pairs {
        let (buys, sells) = if pair.base_token == mint {
            (pair.buys_24h, pair.sells_24h)
        } else if pair.quote_token == mint {
            (pair.sells_24h, pair.buys_24h)
        } else {
            continue;
        };

        let tx_count = buys + sells;
        let buy_share = if tx_count > 0 {
            buys as f64 / tx_count as f64
        } else {
            0.5
        };

        volume.total_24h += pair.volume_24h_usd;
        volume.buy_volume_24h += pair.volume_24h_usd * buy_share;
        volume.sell_volume_24h += pair.volume_24h_usd * (1.0 - buy_share);
        volume.tx_count_24h += tx_count;

        liquidity.total_usd += pair.liquidity_usd;
        liquidity.pools.push(PoolLiquidity {
            venue: pair.venue.clone(),
            pair_address: pair.pair_address.clone(),
            liquidity_usd: pair.liquidity_usd,
        });
    }

    liquidity.pools.sort_by(|a, b| {
        b.liquidity_usd
            .partial_cmp(&a.liquidity_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    (volume, liquidity)
}
