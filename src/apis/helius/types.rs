/// JSON-RPC envelope and result types for the holder provider
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `{ context, value }` wrapper used by the standard RPC methods
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

// ---------------------------------------------------------------------------
// getTokenSupply
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TokenAmount {
    /// Raw amount as a decimal string
    pub amount: String,
    pub decimals: u8,
    #[serde(rename = "uiAmount", default)]
    pub ui_amount: Option<f64>,
}

impl TokenAmount {
    /// Supply in UI units, derived from the raw amount when uiAmount is null
    pub fn ui_value(&self) -> Option<f64> {
        self.ui_amount.or_else(|| {
            self.amount
                .parse::<f64>()
                .ok()
                .map(|raw| raw / 10f64.powi(self.decimals as i32))
        })
    }
}

// ---------------------------------------------------------------------------
// getTokenAccounts (paginated)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TokenAccountsParams<'a> {
    pub mint: &'a str,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct TokenAccountsResult {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub token_accounts: Vec<TokenAccountEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TokenAccountEntry {
    #[serde(default)]
    pub address: Option<String>,
    pub mint: String,
    pub owner: String,
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// getMultipleAccounts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    /// Program that owns the account
    pub owner: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub lamports: u64,
}
