/// Per-client request statistics
use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Snapshot of one client's request counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_latency_ms: f64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl ApiStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Default)]
struct StatsInner {
    stats: ApiStats,
    total_latency_ms: f64,
}

/// Thread-safe request counter shared by an API client
#[derive(Default)]
pub struct ApiStatsTracker {
    inner: RwLock<StatsInner>,
}

impl ApiStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, success: bool, latency_ms: f64) {
        let mut inner = self.inner.write().await;
        inner.stats.total_requests += 1;
        if success {
            inner.stats.successful_requests += 1;
        } else {
            inner.stats.failed_requests += 1;
        }
        inner.total_latency_ms += latency_ms;
        inner.stats.average_latency_ms = inner.total_latency_ms / inner.stats.total_requests as f64;
    }

    /// Remember the error and log it under the API tag
    pub async fn record_error(&self, provider: &str, endpoint: &str, message: String) {
        logger::debug(
            LogTag::Api,
            &format!("[{}] {} failed: {}", provider.to_uppercase(), endpoint, message),
        );

        let mut inner = self.inner.write().await;
        inner.stats.last_error = Some(message);
        inner.stats.last_error_at = Some(Utc::now());
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.inner.read().await.stats.clone()
    }
}
