/// DexScreener pair API client
///
/// Endpoint: GET {endpoint}/tokens/{comma-joined addresses}
/// Returns every pool trading any of the addresses (max 30 per request).
pub mod types;

use self::types::PairsResponse;
use crate::apis::client::HttpClient;
use crate::apis::providers::PairProvider;
use crate::apis::stats::ApiStats;
use crate::config::MarketConfig;
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use crate::types::PairSnapshot;
use async_trait::async_trait;

/// Address limit of the /tokens endpoint
pub const MAX_TOKENS_PER_REQUEST: usize = 30;

pub struct DexScreenerClient {
    http_client: HttpClient,
    endpoint: String,
}

impl DexScreenerClient {
    pub fn new(config: &MarketConfig) -> EngineResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config.provider, config.request_timeout_secs)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.http_client.stats().await
    }
}

#[async_trait]
impl PairProvider for DexScreenerClient {
    fn name(&self) -> &str {
        self.http_client.provider()
    }

    fn max_tokens_per_request(&self) -> usize {
        MAX_TOKENS_PER_REQUEST
    }

    async fn fetch_pairs(&self, token_ids: &[String]) -> EngineResult<Vec<PairSnapshot>> {
        if token_ids.is_empty() {
            return Err(EngineError::validation("pair request without token ids"));
        }
        if token_ids.len() > MAX_TOKENS_PER_REQUEST {
            return Err(EngineError::validation(format!(
                "pair request for {} tokens exceeds limit of {}",
                token_ids.len(),
                MAX_TOKENS_PER_REQUEST
            )));
        }

        let url = format!("{}/tokens/{}", self.endpoint, token_ids.join(","));
        logger::debug(
            LogTag::Api,
            &format!("[DEXSCREENER] Fetching pairs for {} tokens", token_ids.len()),
        );

        let response: PairsResponse = self
            .http_client
            .send_json("tokens", self.http_client.client().get(&url))
            .await?;

        let pairs: Vec<PairSnapshot> = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .map(PairSnapshot::from)
            .collect();

        logger::debug(
            LogTag::Api,
            &format!("[DEXSCREENER] Received {} pairs", pairs.len()),
        );

        Ok(pairs)
    }
}
