/// Jupiter price API client
///
/// Endpoint: GET {endpoint}?ids=<comma-joined ids>&showExtraInfo=true
/// Auth: optional `x-api-key` header
pub mod types;

use self::types::PriceResponse;
use crate::apis::client::HttpClient;
use crate::apis::providers::PriceProvider;
use crate::apis::stats::ApiStats;
use crate::config::PriceConfig;
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use crate::types::RawQuote;
use async_trait::async_trait;

pub struct JupiterPriceClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
}

impl JupiterPriceClient {
    pub fn new(config: &PriceConfig) -> EngineResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config.provider, config.request_timeout_secs)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.http_client.stats().await
    }
}

#[async_trait]
impl PriceProvider for JupiterPriceClient {
    fn name(&self) -> &str {
        self.http_client.provider()
    }

    async fn fetch_prices(&self, ids: &[String]) -> EngineResult<Vec<RawQuote>> {
        if ids.is_empty() {
            return Err(EngineError::validation("price request without ids"));
        }

        let joined = ids.join(",");
        let mut builder = self
            .http_client
            .client()
            .get(&self.endpoint)
            .query(&[("ids", joined.as_str()), ("showExtraInfo", "true")]);
        if !self.api_key.is_empty() {
            builder = builder.header("x-api-key", &self.api_key);
        }

        logger::debug(
            LogTag::Api,
            &format!("[JUPITER] Fetching prices for {} ids", ids.len()),
        );

        let response: PriceResponse = self.http_client.send_json("price", builder).await?;

        let quotes: Vec<RawQuote> = response
            .data
            .into_iter()
            .map(|(id, entry)| match entry {
                Some(entry) => RawQuote {
                    id,
                    price: entry.price,
                    confidence: entry.resolved_confidence(),
                },
                None => RawQuote {
                    id,
                    price: None,
                    confidence: None,
                },
            })
            .collect();

        logger::debug(
            LogTag::Api,
            &format!(
                "[JUPITER] Received {} quotes for {} requested ids",
                quotes.len(),
                ids.len()
            ),
        );

        Ok(quotes)
    }
}
