/// DexScreener pair response types
///
/// Every nested metric is optional: young or illiquid pools routinely omit
/// liquidity, volume or txns.
use crate::types::PairSnapshot;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PairsResponse {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: Option<String>,
    /// null when no pool matches
    #[serde(default)]
    pub pairs: Option<Vec<PairEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct PairEntry {
    #[serde(rename = "dexId")]
    pub dex_id: String,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: TokenRef,
    #[serde(rename = "quoteToken")]
    pub quote_token: TokenRef,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub txns: Option<Txns>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRef {
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Volume {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Txns {
    #[serde(default)]
    pub h24: Option<TxnCounts>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TxnCounts {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

impl From<PairEntry> for PairSnapshot {
    fn from(entry: PairEntry) -> Self {
        let counts = entry.txns.and_then(|t| t.h24).unwrap_or_default();
        PairSnapshot {
            venue: entry.dex_id,
            pair_address: entry.pair_address,
            base_token: entry.base_token.address,
            quote_token: entry.quote_token.address,
            liquidity_usd: entry.liquidity.and_then(|l| l.usd).unwrap_or(0.0).max(0.0),
            volume_24h_usd: entry.volume.and_then(|v| v.h24).unwrap_or(0.0).max(0.0),
            buys_24h: counts.buys,
            sells_24h: counts.sells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_with_missing_metrics() {
        let body = r#"{
            "schemaVersion": "1.0.0",
            "pairs": [
                {
                    "chainId": "solana",
                    "dexId": "raydium",
                    "pairAddress": "PAIR1",
                    "baseToken": {"address": "BONK", "symbol": "BONK"},
                    "quoteToken": {"address": "SOL", "symbol": "SOL"},
                    "liquidity": {"usd": 250000.5, "base": 1, "quote": 2},
                    "volume": {"h24": 80000.0, "h6": 1.0},
                    "txns": {"h24": {"buys": 300, "sells": 100}}
                },
                {
                    "dexId": "orca",
                    "pairAddress": "PAIR2",
                    "baseToken": {"address": "BONK"},
                    "quoteToken": {"address": "USDC"}
                }
            ]
        }"#;

        let parsed: PairsResponse = serde_json::from_str(body).unwrap();
        let snapshots: Vec<PairSnapshot> = parsed
            .pairs
            .unwrap()
            .into_iter()
            .map(PairSnapshot::from)
            .collect();

        assert_eq!(snapshots[0].venue, "raydium");
        assert_eq!(snapshots[0].liquidity_usd, 250000.5);
        assert_eq!(snapshots[0].buys_24h, 300);
        assert_eq!(snapshots[1].liquidity_usd, 0.0);
        assert_eq!(snapshots[1].sells_24h, 0);
    }

    #[test]
    fn test_null_pairs() {
        let parsed: PairsResponse =
            serde_json::from_str(r#"{"schemaVersion": "1.0.0", "pairs": null}"#).unwrap();
        assert!(parsed.pairs.is_none());
    }
}
