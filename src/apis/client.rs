/// Base HTTP client shared by the upstream API clients
///
/// Applies the per-request timeout, records request statistics and turns
/// transport failures, non-success statuses and undecodable bodies into
/// `EngineError` variants the retry layer can classify.
use super::stats::{ApiStats, ApiStatsTracker};
use crate::errors::{EngineError, EngineResult};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct HttpClient {
    client: Client,
    timeout: Duration,
    provider: String,
    stats: Arc<ApiStatsTracker>,
}

impl HttpClient {
    pub fn new(provider: &str, timeout_secs: u64) -> EngineResult<Self> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            provider: provider.to_string(),
            stats: Arc::new(ApiStatsTracker::new()),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub async fn stats(&self) -> ApiStats {
        self.stats.get_stats().await
    }

    /// Send the request and decode a JSON body of type `T`
    ///
    /// `endpoint` is a short label used in errors and stats (no secrets).
    pub async fn send_json<T>(&self, endpoint: &str, builder: RequestBuilder) -> EngineResult<T>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let response_result = builder.timeout(self.timeout).send().await;
        let elapsed = start.elapsed().as_millis() as f64;

        let response = match response_result {
            Ok(response) => response,
            Err(err) => {
                let error = self.transport_error(endpoint, "request failed", err);
                self.fail(endpoint, elapsed, &error).await;
                return Err(error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = EngineError::from_status(&self.provider, endpoint, status.as_u16(), body);
            self.fail(endpoint, elapsed, &error).await;
            return Err(error);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                let error = self.transport_error(endpoint, "body read failed", err);
                self.fail(endpoint, elapsed, &error).await;
                return Err(error);
            }
        };

        match serde_json::from_str::<T>(&body) {
            Ok(value) => {
                self.stats.record_request(true, elapsed).await;
                Ok(value)
            }
            Err(err) => {
                let error = EngineError::invalid_response(
                    &self.provider,
                    format!("{}: failed to parse response: {}", endpoint, err),
                );
                self.fail(endpoint, elapsed, &error).await;
                Err(error)
            }
        }
    }

    /// The client timeout covers the body too, so both stages can time out
    fn transport_error(&self, endpoint: &str, stage: &str, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            EngineError::network(format!("{} {}: {}", endpoint, stage, err))
        }
    }

    async fn fail(&self, endpoint: &str, elapsed: f64, error: &EngineError) {
        self.stats.record_request(false, elapsed).await;
        self.stats
            .record_error(&self.provider, endpoint, error.to_string())
            .await;
    }
}
