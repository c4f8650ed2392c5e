/// Structured error handling for the market-data engine
///
/// Every fallible operation returns `EngineResult<T>`. The variants follow the
/// engine's taxonomy: validation problems fail fast, network-class problems
/// are retried by `RetryExecutor`, and exhausted retries surface as
/// `EngineError::Aggregate` with a stable context message.
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Stable context messages for aggregate failures (callers match on these)
pub const PRICE_FETCH_FAILED: &str = "Failed to fetch prices";
pub const METRICS_FETCH_FAILED: &str = "Failed to fetch market metrics";
pub const HEALTH_FETCH_FAILED: &str = "Failed to fetch AMM health";

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {endpoint} did not answer within {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Rate limit exceeded: {provider}")]
    RateLimited { provider: String },

    #[error("HTTP {status} from {endpoint}: {body}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("{context}: {source} (after {attempts} attempts)")]
    Aggregate {
        context: String,
        attempts: u32,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        EngineError::Network(message.into())
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration(message.into())
    }

    /// Wrap the last error of an exhausted retry sequence
    pub fn aggregate(context: impl Into<String>, attempts: u32, last: EngineError) -> Self {
        EngineError::Aggregate {
            context: context.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Build the error matching an upstream HTTP status code
    pub fn from_status(provider: &str, endpoint: &str, status: u16, body: String) -> Self {
        if status == 429 {
            EngineError::RateLimited {
                provider: provider.to_string(),
            }
        } else {
            EngineError::HttpStatus {
                endpoint: endpoint.to_string(),
                status,
                body,
            }
        }
    }

    /// Upstream explicitly rejected the request; retrying cannot help
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::Validation(_) => true,
            EngineError::InvalidResponse { .. } => true,
            EngineError::Configuration(_) => true,
            EngineError::HttpStatus { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Transient/network-class failures that `RetryExecutor` retries
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Network(_) => true,
            EngineError::Timeout { .. } => true,
            EngineError::RateLimited { .. } => true,
            EngineError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Aggregate failure context, if this error came out of an exhausted retry sequence
    pub fn context(&self) -> Option<&str> {
        match self {
            EngineError::Aggregate { context, .. } => Some(context.as_str()),
            _ => None,
        }
    }

    /// Status code the HTTP route layer is expected to answer with
    pub fn status_hint(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::Configuration(_) => 500,
            _ => 502,
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Configuration(format!("Failed to parse config: {}", err))
    }
}
