//! Upstream API layer
//!
//! HTTP clients for the price, holder and pair providers, plus the
//! cross-cutting request machinery: per-provider token buckets, bounded
//! retries and id batching.

pub mod batching;
pub mod client;
pub mod dexscreener;
pub mod helius;
pub mod jupiter;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
pub mod stats;
pub mod upstream;

pub use batching::{dedupe, partition};
pub use client::HttpClient;
pub use dexscreener::DexScreenerClient;
pub use helius::HeliusClient;
pub use jupiter::JupiterPriceClient;
pub use providers::{HolderProvider, PairProvider, PriceProvider};
pub use rate_limiter::RateLimiter;
pub use retry::RetryExecutor;
pub use stats::{ApiStats, ApiStatsTracker};
pub use upstream::Upstream;
