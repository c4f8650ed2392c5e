/// Upstream provider seams
///
/// Services depend on these traits, not on concrete HTTP clients, so tests
/// can substitute in-memory providers.
use crate::errors::EngineResult;
use crate::types::{HolderClass, MintSupply, PairSnapshot, RawQuote, TokenAccountRecord};
use async_trait::async_trait;
use std::collections::HashMap;

/// Price-quote provider (one call per batch of ids)
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider identity, also the rate-limit bucket key
    fn name(&self) -> &str;

    /// Quotes for `ids`; ids the provider does not know may be absent
    async fn fetch_prices(&self, ids: &[String]) -> EngineResult<Vec<RawQuote>>;
}

/// Mint, holder and account-classification provider
#[async_trait]
pub trait HolderProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_mint_supply(&self, mint: &str) -> EngineResult<MintSupply>;

    /// One page of token accounts (pages start at 1); empty page ends pagination
    async fn fetch_token_accounts(
        &self,
        mint: &str,
        page: u32,
        limit: u32,
    ) -> EngineResult<Vec<TokenAccountRecord>>;

    /// Account class of each address; addresses the provider cannot resolve may be absent
    async fn fetch_owner_classes(
        &self,
        owners: &[String],
    ) -> EngineResult<HashMap<String, HolderClass>>;
}

/// AMM pair provider (volume, liquidity and flow per pool)
#[async_trait]
pub trait PairProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Largest number of token ids accepted per call
    fn max_tokens_per_request(&self) -> usize {
        30
    }

    /// Every pool that trades any of `token_ids`
    async fn fetch_pairs(&self, token_ids: &[String]) -> EngineResult<Vec<PairSnapshot>>;
}
