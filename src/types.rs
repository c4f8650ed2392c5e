/// Shared data model for the market-data engine
///
/// Everything here is plain data: produced by providers or services, never
/// mutated after creation, serializable for the HTTP layer that consumes it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque identifier of a tradable asset (mint address, symbol, ...)
pub type TokenId = String;

// =============================================================================
// PRICES
// =============================================================================

/// Price quote as reported by the upstream provider, before filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub id: TokenId,
    /// None when the provider has no (numeric) price
    pub price: Option<f64>,
    /// None when the provider did not report a confidence
    pub confidence: Option<f64>,
}

/// A priced, confidence-scored quote that passed filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub id: TokenId,
    pub price: f64,
    pub confidence: f64,
}

impl PriceQuote {
    /// Accept a raw quote only if its price is a positive finite number and its
    /// confidence meets `threshold`
    pub fn from_raw(raw: &RawQuote, threshold: f64) -> Option<Self> {
        let price = raw.price.filter(|p| p.is_finite() && *p > 0.0)?;
        let confidence = raw.confidence.filter(|c| c.is_finite())?;
        if confidence < threshold {
            return None;
        }
        Some(Self {
            id: raw.id.clone(),
            price,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

/// Ordered id → quote map; ordering keeps serialized output stable
pub type PriceMap = BTreeMap<TokenId, PriceQuote>;

// =============================================================================
// HOLDERS & SUPPLY
// =============================================================================

/// Account class of a holder (owner) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HolderClass {
    Program,
    TokenAccount,
    SystemAccount,
    AssociatedTokenAccount,
    Other,
    Unknown,
}

/// Mint supply and decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintSupply {
    pub mint: TokenId,
    /// Supply in UI units (raw / 10^decimals)
    pub total_supply: f64,
    pub decimals: u8,
}

/// One token account from a holder page (raw amount)
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountRecord {
    pub owner: String,
    pub mint: TokenId,
    pub amount: u64,
}

/// Aggregated balance of one owner across all of its token accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub owner: String,
    pub balance: f64,
    pub classification: HolderClass,
}

// =============================================================================
// PAIRS / VENUES
// =============================================================================

/// One AMM pool as reported by the pair provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSnapshot {
    /// Venue (DEX) identifier, e.g. "raydium"
    pub venue: String,
    pub pair_address: String,
    pub base_token: TokenId,
    pub quote_token: TokenId,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub buys_24h: u64,
    pub sells_24h: u64,
}

// =============================================================================
// MARKET METRICS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyMetrics {
    pub total: f64,
    pub circulating: f64,
    pub locked: f64,
    pub burned: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    pub holder_count: usize,
    pub gini_coefficient: f64,
    pub top_10_concentration: f64,
    pub top_50_concentration: f64,
    pub top_100_concentration: f64,
    /// Holder count per classification
    pub holders_by_class: BTreeMap<HolderClass, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetrics {
    pub total_24h: f64,
    pub buy_volume_24h: f64,
    pub sell_volume_24h: f64,
    pub tx_count_24h: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolLiquidity {
    pub venue: String,
    pub pair_address: String,
    pub liquidity_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    pub total_usd: f64,
    pub pools: Vec<PoolLiquidity>,
}

/// Derived analytics for one mint; recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub mint: TokenId,
    pub supply: SupplyMetrics,
    pub distribution: DistributionMetrics,
    pub volume: VolumeMetrics,
    pub liquidity: LiquidityMetrics,
    pub computed_at: DateTime<Utc>,
}

// =============================================================================
// AMM HEALTH
// =============================================================================

/// Per-venue health breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueHealth {
    pub venue: String,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub liquidity_score: f64,
    pub volume_score: f64,
    pub flow_score: f64,
    /// Mean of the three component scores, in [0, 1]
    pub score: f64,
}

/// Health score for a token set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmHealthScore {
    /// Sorted, comma-joined token ids
    pub token_set_key: String,
    /// Average of the venue scores, in [0, 1]
    pub score: f64,
    pub venues: Vec<VenueHealth>,
    pub timestamp: DateTime<Utc>,
}

/// Health scores, verdict and the threshold it was judged against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub scores: HashMap<String, f64>,
    pub healthy: bool,
    pub threshold: f64,
}
