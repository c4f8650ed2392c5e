/// JSON-RPC holder provider (Helius-compatible)
///
/// Methods used:
/// 1. getTokenSupply - mint supply and decimals
/// 2. getTokenAccounts - paginated token accounts of a mint
/// 3. getMultipleAccounts - owner program of each holder address
pub mod types;

use self::types::{
    AccountInfo, RpcRequest, RpcResponse, TokenAccountsParams, TokenAccountsResult, TokenAmount,
    WithContext,
};
use crate::apis::client::HttpClient;
use crate::apis::providers::HolderProvider;
use crate::apis::stats::ApiStats;
use crate::config::HolderConfig;
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use crate::types::{HolderClass, MintSupply, TokenAccountRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// JSON-RPC codes signalling throttling
const RPC_RATE_LIMIT_CODES: [i64; 2] = [429, -32429];
/// JSON-RPC codes for malformed requests; retrying cannot help
const RPC_CLIENT_ERROR_CODES: [i64; 3] = [-32600, -32601, -32602];

pub struct HeliusClient {
    http_client: HttpClient,
    rpc_url: String,
    api_key: String,
}

impl HeliusClient {
    pub fn new(config: &HolderConfig) -> EngineResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config.provider, config.request_timeout_secs)?,
            rpc_url: config.rpc_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.http_client.stats().await
    }

    async fn call<P, T>(&self, method: &str, params: P) -> EngineResult<T>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let mut builder = self
            .http_client
            .client()
            .post(&self.rpc_url)
            .json(&RpcRequest::new(method, params));
        if !self.api_key.is_empty() {
            builder = builder.query(&[("api-key", self.api_key.as_str())]);
        }

        let response: RpcResponse<T> = self.http_client.send_json(method, builder).await?;

        if let Some(error) = response.error {
            logger::debug(
                LogTag::Api,
                &format!(
                    "[HELIUS] {} returned RPC error {}: {}",
                    method, error.code, error.message
                ),
            );
            return Err(self.map_rpc_error(method, error.code, &error.message));
        }

        response.result.ok_or_else(|| {
            EngineError::invalid_response(
                self.http_client.provider(),
                format!("{}: response has neither result nor error", method),
            )
        })
    }

    fn map_rpc_error(&self, method: &str, code: i64, message: &str) -> EngineError {
        if RPC_RATE_LIMIT_CODES.contains(&code) {
            EngineError::RateLimited {
                provider: self.http_client.provider().to_string(),
            }
        } else if RPC_CLIENT_ERROR_CODES.contains(&code) {
            EngineError::invalid_response(
                self.http_client.provider(),
                format!("{} rejected ({}): {}", method, code, message),
            )
        } else {
            EngineError::network(format!("{} RPC error {}: {}", method, code, message))
        }
    }
}

/// Account class from on-chain account info of an owner address
pub fn classify_account(info: Option<&AccountInfo>) -> HolderClass {
    let Some(info) = info else {
        return HolderClass::Unknown;
    };

    if info.executable {
        return HolderClass::Program;
    }

    match info.owner.as_str() {
        SYSTEM_PROGRAM_ID => HolderClass::SystemAccount,
        TOKEN_PROGRAM_ID | TOKEN_2022_PROGRAM_ID => HolderClass::TokenAccount,
        ASSOCIATED_TOKEN_PROGRAM_ID => HolderClass::AssociatedTokenAccount,
        _ => HolderClass::Other,
    }
}

#[async_trait]
impl HolderProvider for HeliusClient {
    fn name(&self) -> &str {
        self.http_client.provider()
    }

    async fn fetch_mint_supply(&self, mint: &str) -> EngineResult<MintSupply> {
        let supply: WithContext<TokenAmount> = self.call("getTokenSupply", json!([mint])).await?;

        let total_supply = supply.value.ui_value().ok_or_else(|| {
            EngineError::invalid_response(
                self.http_client.provider(),
                format!("getTokenSupply: unparseable amount '{}'", supply.value.amount),
            )
        })?;

        Ok(MintSupply {
            mint: mint.to_string(),
            total_supply,
            decimals: supply.value.decimals,
        })
    }

    async fn fetch_token_accounts(
        &self,
        mint: &str,
        page: u32,
        limit: u32,
    ) -> EngineResult<Vec<TokenAccountRecord>> {
        let result: TokenAccountsResult = self
            .call("getTokenAccounts", TokenAccountsParams { mint, page, limit })
            .await?;

        logger::verbose(
            LogTag::Api,
            &format!(
                "[HELIUS] {} page {}: {} accounts (total {:?})",
                mint,
                page,
                result.token_accounts.len(),
                result.total
            ),
        );

        Ok(result
            .token_accounts
            .into_iter()
            .map(|entry| TokenAccountRecord {
                owner: entry.owner,
                mint: entry.mint,
                amount: entry.amount,
            })
            .collect())
    }

    async fn fetch_owner_classes(
        &self,
        owners: &[String],
    ) -> EngineResult<HashMap<String, HolderClass>> {
        if owners.is_empty() {
            return Ok(HashMap::new());
        }

        let accounts: WithContext<Vec<Option<AccountInfo>>> = self
            .call(
                "getMultipleAccounts",
                json!([owners, { "encoding": "base64", "dataSlice": { "offset": 0, "length": 0 } }]),
            )
            .await?;

        if accounts.value.len() != owners.len() {
            return Err(EngineError::invalid_response(
                self.http_client.provider(),
                format!(
                    "getMultipleAccounts: asked for {} accounts, got {}",
                    owners.len(),
                    accounts.value.len()
                ),
            ));
        }

        Ok(owners
            .iter()
            .zip(accounts.value.iter())
            .map(|(owner, info)| (owner.clone(), classify_account(info.as_ref())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(owner: &str, executable: bool) -> AccountInfo {
        AccountInfo {
            owner: owner.to_string(),
            executable,
            lamports: 1,
        }
    }

    #[test]
    fn test_classify_account() {
        assert_eq!(classify_account(None), HolderClass::Unknown);
        assert_eq!(
            classify_account(Some(&info("BPFLoaderUpgradeab1e11111111111111111111111", true))),
            HolderClass::Program
        );
        assert_eq!(
            classify_account(Some(&info(SYSTEM_PROGRAM_ID, false))),
            HolderClass::SystemAccount
        );
        assert_eq!(
            classify_account(Some(&info(TOKEN_2022_PROGRAM_ID, false))),
            HolderClass::TokenAccount
        );
        assert_eq!(
            classify_account(Some(&info(ASSOCIATED_TOKEN_PROGRAM_ID, false))),
            HolderClass::AssociatedTokenAccount
        );
        assert_eq!(
            classify_account(Some(&info("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", false))),
            HolderClass::Other
        );
    }

    #[test]
    fn test_rpc_error_mapping() {
        let client = HeliusClient::new(&HolderConfig::default()).unwrap();

        assert!(matches!(
            client.map_rpc_error("getTokenAccounts", -32429, "slow down"),
            EngineError::RateLimited { .. }
        ));
        assert!(client
            .map_rpc_error("getTokenAccounts", -32602, "invalid mint")
            .is_client_error());
        assert!(client
            .map_rpc_error("getTokenAccounts", -32603, "internal")
            .is_retryable());
    }
}
