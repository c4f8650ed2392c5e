/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support (every field optional in TOML)
use crate::config_struct;

// ============================================================================
// PRICE PROVIDER CONFIGURATION
// ============================================================================

config_struct! {
    /// Upstream price-quote provider
    pub struct PriceConfig {
        /// Provider identity (rate-limit bucket key)
        provider: String = "jupiter".to_string(),
        endpoint: String = "https://api.jup.ag/price/v2".to_string(),
        /// Sent as x-api-key when non-empty
        api_key: String = String::new(),

        /// Ids per upstream request
        batch_size: usize = 100,
        /// Quotes below this confidence are dropped
        confidence_threshold: f64 = 0.5,

        request_timeout_secs: u64 = 10,
        /// Total attempts per batch (1 initial + retries)
        max_retries: u32 = 3,
        retry_base_delay_ms: u64 = 1000,
    }
}

// ============================================================================
// HOLDER / ACCOUNT PROVIDER CONFIGURATION
// ============================================================================

config_struct! {
    /// JSON-RPC holder/account provider and classification rules
    pub struct HolderConfig {
        provider: String = "helius".to_string(),
        rpc_url: String = "https://mainnet.helius-rpc.com".to_string(),
        /// Appended as ?api-key= when non-empty
        api_key: String = String::new(),

        /// Token accounts per page
        page_limit: u32 = 1000,
        /// Pagination safety cap
        max_pages: u32 = 100,
        /// Owners per classification lookup
        classification_batch_size: usize = 20,

        /// Owners classified as programs without an upstream lookup
        known_program_ids: Vec<String> = vec![
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
            "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb".to_string(),
            "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string(),
            "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc".to_string(),
            "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P".to_string(),
        ],
        /// Burn sinks; balances count as burned
        burn_addresses: Vec<String> = vec![
            "1nc1nerator11111111111111111111111111111111".to_string(),
            "11111111111111111111111111111111".to_string(),
        ],
        /// Lockers/vesting vaults; balances count as locked
        locked_addresses: Vec<String> = Vec::new(),

        request_timeout_secs: u64 = 10,
        max_retries: u32 = 3,
        retry_base_delay_ms: u64 = 500,
    }
}

// ============================================================================
// ACTIVITY / AMM PROVIDER CONFIGURATION
// ============================================================================

config_struct! {
    /// Pair-level volume and liquidity provider (DexScreener-style API)
    pub struct MarketConfig {
        provider: String = "dexscreener".to_string(),
        endpoint: String = "https://api.dexscreener.com/latest/dex".to_string(),
        request_timeout_secs: u64 = 10,
        max_retries: u32 = 3,
        retry_base_delay_ms: u64 = 500,
    }
}

config_struct! {
    /// AMM health scoring
    pub struct HealthConfig {
        /// Average venue score needed for is_healthy
        threshold: f64 = 0.8,
        /// Liquidity at which a venue's liquidity score saturates
        target_liquidity_usd: f64 = 100_000.0,
        /// 24h volume at which a venue's volume score saturates
        target_volume_usd: f64 = 50_000.0,
    }
}

// ============================================================================
// RATE LIMITS
// ============================================================================

config_struct! {
    /// Token bucket for one upstream provider
    pub struct ProviderLimitConfig {
        provider: String = "default".to_string(),
        max_tokens: f64 = 60.0,
        refill_per_second: f64 = 1.0,
        /// Start with a full bucket (burst) instead of an empty one
        start_full: bool = false,
    }
}

impl ProviderLimitConfig {
    /// Bucket that starts full, allowing an initial burst of `max_tokens`
    pub fn new(provider: &str, max_tokens: f64, refill_per_second: f64) -> Self {
        Self {
            provider: provider.to_string(),
            max_tokens,
            refill_per_second,
            start_full: true,
        }
    }

    /// Empty-start bucket for a strict `per_minute` ceiling
    pub fn per_minute(provider: &str, per_minute: u32) -> Self {
        Self {
            start_full: false,
            ..Self::new(provider, per_minute as f64, per_minute as f64 / 60.0)
        }
    }
}

config_struct! {
    pub struct RateLimitsConfig {
        providers: Vec<ProviderLimitConfig> = vec![
            ProviderLimitConfig::per_minute("jupiter", 600),
            ProviderLimitConfig {
                start_full: false,
                ..ProviderLimitConfig::new("helius", 50.0, 10.0)
            },
            ProviderLimitConfig::per_minute("dexscreener", 300),
        ],
        /// Used for providers without an explicit entry
        fallback: ProviderLimitConfig = ProviderLimitConfig::default(),
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

config_struct! {
    /// TTLs per data category, sizes and sweep interval
    pub struct CacheSettings {
        token_metadata_ttl_secs: u64 = 300,
        /// Merged result of a whole price request
        price_ttl_secs: u64 = 5,
        /// Single confident quotes served by get_price
        quote_ttl_secs: u64 = 3,
        price_batch_ttl_secs: u64 = 300,
        market_ttl_secs: u64 = 60,
        health_ttl_secs: u64 = 60,
        max_entries: usize = 1000,
        sweep_interval_secs: u64 = 60,
    }
}

config_struct! {
    pub struct EventsConfig {
        /// Broadcast buffer; slow subscribers lag past this
        channel_capacity: usize = 256,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Complete engine configuration
    pub struct EngineConfig {
        price: PriceConfig = PriceConfig::default(),
        holders: HolderConfig = HolderConfig::default(),
        market: MarketConfig = MarketConfig::default(),
        health: HealthConfig = HealthConfig::default(),
        rate_limits: RateLimitsConfig = RateLimitsConfig::default(),
        cache: CacheSettings = CacheSettings::default(),
        events: EventsConfig = EventsConfig::default(),
    }
}
