//! Broadcasting channel for market events
//!
//! Pub/sub for price, metrics and health updates. Owned by the engine and
//! cloned into each service rather than held in a global.

use crate::logger::{self, LogTag};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A freshly fetched price batch was filtered and cached
    PricesUpdated { ids: Vec<String>, count: usize },
    MetricsComputed { mint: String },
    HealthEvaluated { token_set_key: String, score: f64 },
    /// A batch failed after retries; its ids are absent from the result
    BatchFailed {
        provider: String,
        ids: Vec<String>,
        error: String,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::PricesUpdated { .. } => "prices_updated",
            MarketEvent::MetricsComputed { .. } => "metrics_computed",
            MarketEvent::HealthEvaluated { .. } => "health_evaluated",
            MarketEvent::BatchFailed { .. } => "batch_failed",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Broadcast an event to all subscribers
    ///
    /// Non-blocking; with no receivers the event is dropped.
    pub fn publish(&self, event: MarketEvent) {
        let kind = event.kind();
        let delivered = self.sender.send(event).unwrap_or(0);
        logger::verbose(
            LogTag::Events,
            &format!("{} delivered to {} subscribers", kind, delivered),
        );
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.publish(MarketEvent::MetricsComputed {
            mint: "BONK".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(MarketEvent::HealthEvaluated {
            token_set_key: "BONK,SOL".to_string(),
            score: 0.85,
        });

        for receiver in [&mut first, &mut second] {
            match receiver.recv().await.unwrap() {
                MarketEvent::HealthEvaluated { score, .. } => assert_eq!(score, 0.85),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(MarketEvent::PricesUpdated {
            ids: vec!["SOL".to_string()],
            count: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "prices_updated");
        assert_eq!(json["count"], 1);
    }
}
