/// Cache configuration per data category
///
/// Per-category TTLs live in `CacheSettings`. Staleness tolerance differs by
/// two orders of magnitude between categories:
/// - Token metadata: long TTL (supply/decimals change rarely)
/// - Prices: seconds per request and per quote, minutes per filtered upstream batch
/// - Market aggregate: medium TTL (holder/volume analytics are expensive)
use crate::config::CacheSettings;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Time-to-live for cached entries
    pub ttl: Duration,

    /// Maximum number of entries (LRU eviction when exceeded)
    pub capacity: usize,
}

impl CacheConfig {
    /// Custom configuration
    pub fn custom(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        }
    }

    /// Same category with TTL/size taken from user settings
    pub fn with_settings(ttl_secs: u64, settings: &CacheSettings) -> Self {
        Self::custom(ttl_secs, settings.max_entries)
    }
}
