/// Jupiter price API response types
///
/// Prices arrive as strings (`"153.21"`), occasionally as numbers or null.
/// Confidence is either a numeric field or `extraInfo.confidenceLevel`.
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    pub data: HashMap<String, Option<PriceEntry>>,
    #[serde(rename = "timeTaken", default)]
    pub time_taken: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PriceEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(rename = "extraInfo", default)]
    pub extra_info: Option<ExtraInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ExtraInfo {
    #[serde(rename = "confidenceLevel", default)]
    pub confidence_level: Option<String>,
}

impl PriceEntry {
    /// Numeric confidence, falling back to the qualitative level
    pub fn resolved_confidence(&self) -> Option<f64> {
        self.confidence.or_else(|| {
            self.extra_info
                .as_ref()
                .and_then(|info| info.confidence_level.as_deref())
                .and_then(confidence_from_level)
        })
    }
}

/// Map a qualitative confidence level to a score
pub fn confidence_from_level(level: &str) -> Option<f64> {
    match level.to_ascii_lowercase().as_str() {
        "high" => Some(0.9),
        "medium" => Some(0.6),
        "low" => Some(0.2),
        _ => None,
    }
}

/// Accept numbers and numeric strings; anything else becomes None
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_entries() {
        let body = r#"{
            "data": {
                "SOL": {"id": "SOL", "price": "153.21", "extraInfo": {"confidenceLevel": "high"}},
                "BONK": {"id": "BONK", "price": 0.000021, "confidence": 0.4},
                "DEAD": null,
                "WEIRD": {"id": "WEIRD", "price": "n/a", "confidence": "0.95"}
            },
            "timeTaken": 0.004
        }"#;

        let parsed: PriceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 4);

        let sol = parsed.data["SOL"].as_ref().unwrap();
        assert_eq!(sol.price, Some(153.21));
        assert_eq!(sol.resolved_confidence(), Some(0.9));

        let bonk = parsed.data["BONK"].as_ref().unwrap();
        assert_eq!(bonk.resolved_confidence(), Some(0.4));

        assert!(parsed.data["DEAD"].is_none());

        let weird = parsed.data["WEIRD"].as_ref().unwrap();
        assert_eq!(weird.price, None);
        assert_eq!(weird.confidence, Some(0.95));
    }

    #[test]
    fn test_missing_data_is_an_error() {
        assert!(serde_json::from_str::<PriceResponse>(r#"{"prices": {}}"#).is_err());
    }
}
