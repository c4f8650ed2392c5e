/// Configuration utilities - loading, environment overrides and validation
///
/// Loading order:
/// 1. TOML file (defaults for every missing field, all defaults if no file)
/// 2. Environment overrides (`MARKET_ENGINE_*`)
/// 3. Validation
use super::schemas::{EngineConfig, ProviderLimitConfig};
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use std::path::Path;

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/market_engine.toml";

pub const ENV_PRICE_API_KEY: &str = "MARKET_ENGINE_PRICE_API_KEY";
pub const ENV_RPC_URL: &str = "MARKET_ENGINE_RPC_URL";
pub const ENV_RPC_API_KEY: &str = "MARKET_ENGINE_RPC_API_KEY";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "MARKET_ENGINE_CONFIDENCE_THRESHOLD";
pub const ENV_HEALTH_THRESHOLD: &str = "MARKET_ENGINE_HEALTH_THRESHOLD";

/// Load configuration from the default path
pub fn load_config() -> EngineResult<EngineConfig> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_config_from_path(path: impl AsRef<Path>) -> EngineResult<EngineConfig> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        parse_config(&contents)?
    } else {
        logger::warning(
            LogTag::Config,
            &format!(
                "Config file '{}' not found, using default values",
                path.display()
            ),
        );
        EngineConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;

    logger::info(
        LogTag::Config,
        &format!(
            "Configuration loaded: price provider {} (batch {}), {} rate-limited providers",
            config.price.provider,
            config.price.batch_size,
            config.rate_limits.providers.len()
        ),
    );

    Ok(config)
}

/// Parse a TOML document into the engine configuration
pub fn parse_config(contents: &str) -> EngineResult<EngineConfig> {
    Ok(toml::from_str::<EngineConfig>(contents)?)
}

/// Apply environment overrides using the given lookup function
pub fn apply_env_overrides<F>(config: &mut EngineConfig, lookup: F) -> EngineResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_PRICE_API_KEY) {
        config.price.api_key = key;
    }
    if let Some(url) = lookup(ENV_RPC_URL) {
        config.holders.rpc_url = url;
    }
    if let Some(key) = lookup(ENV_RPC_API_KEY) {
        config.holders.api_key = key;
    }
    if let Some(raw) = lookup(ENV_CONFIDENCE_THRESHOLD) {
        config.price.confidence_threshold = parse_f64(ENV_CONFIDENCE_THRESHOLD, &raw)?;
    }
    if let Some(raw) = lookup(ENV_HEALTH_THRESHOLD) {
        config.health.threshold = parse_f64(ENV_HEALTH_THRESHOLD, &raw)?;
    }
    Ok(())
}

fn parse_f64(name: &str, raw: &str) -> EngineResult<f64> {
    raw.trim().parse::<f64>().map_err(|e| {
        EngineError::configuration(format!("Invalid value '{}' for {}: {}", raw, name, e))
    })
}

/// Reject configurations the engine cannot run with
pub fn validate_config(config: &EngineConfig) -> EngineResult<()> {
    check_fraction("price.confidence_threshold", config.price.confidence_threshold)?;
    check_fraction("health.threshold", config.health.threshold)?;

    check_positive("price.batch_size", config.price.batch_size as f64)?;
    check_positive("price.max_retries", config.price.max_retries as f64)?;
    check_positive("price.request_timeout_secs", config.price.request_timeout_secs as f64)?;
    check_positive("holders.page_limit", config.holders.page_limit as f64)?;
    check_positive(
        "holders.classification_batch_size",
        config.holders.classification_batch_size as f64,
    )?;
    check_positive("holders.max_retries", config.holders.max_retries as f64)?;
    check_positive("market.max_retries", config.market.max_retries as f64)?;
    check_positive("health.target_liquidity_usd", config.health.target_liquidity_usd)?;
    check_positive("health.target_volume_usd", config.health.target_volume_usd)?;
    check_positive("cache.max_entries", config.cache.max_entries as f64)?;
    check_positive("events.channel_capacity", config.events.channel_capacity as f64)?;

    check_url("price.endpoint", &config.price.endpoint)?;
    check_url("holders.rpc_url", &config.holders.rpc_url)?;
    check_url("market.endpoint", &config.market.endpoint)?;

    for limit in config
        .rate_limits
        .providers
        .iter()
        .chain(std::iter::once(&config.rate_limits.fallback))
    {
        check_limit(limit)?;
    }

    Ok(())
}

fn check_fraction(field: &str, value: f64) -> EngineResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::configuration(format!(
            "{} must be within [0, 1], got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> EngineResult<()> {
    if !(value > 0.0) {
        return Err(EngineError::configuration(format!(
            "{} must be greater than zero, got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_url(field: &str, value: &str) -> EngineResult<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| EngineError::configuration(format!("{} is not a valid URL: {}", field, e)))
}

fn check_limit(limit: &ProviderLimitConfig) -> EngineResult<()> {
    if limit.provider.trim().is_empty() {
        return Err(EngineError::configuration(
            "rate limit entry without provider name",
        ));
    }
    check_positive(
        &format!("rate_limits.{}.max_tokens", limit.provider),
        limit.max_tokens,
    )?;
    check_positive(
        &format!("rate_limits.{}.refill_per_second", limit.provider),
        limit.refill_per_second,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.price.batch_size, 100);
        assert_eq!(config.price.confidence_threshold, 0.5);
        assert_eq!(config.holders.classification_batch_size, 20);
        assert_eq!(config.health.threshold, 0.8);
        assert_eq!(config.cache.price_batch_ttl_secs, 300);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = parse_config(
            r#"
            [price]
            batch_size = 50
            confidence_threshold = 0.7

            [[rate_limits.providers]]
            provider = "jupiter"
            max_tokens = 10.0
            refill_per_second = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.price.batch_size, 50);
        assert_eq!(config.price.confidence_threshold, 0.7);
        assert_eq!(config.price.max_retries, 3);
        assert_eq!(config.rate_limits.providers.len(), 1);
        assert!(!config.rate_limits.providers[0].start_full);
        assert_eq!(config.health, Default::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_PRICE_API_KEY => Some("secret".to_string()),
            ENV_HEALTH_THRESHOLD => Some("0.65".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.price.api_key, "secret");
        assert_eq!(config.health.threshold, 0.65);

        let bad = apply_env_overrides(&mut config, |key| {
            (key == ENV_CONFIDENCE_THRESHOLD).then(|| "high".to_string())
        });
        assert!(matches!(bad, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.price.confidence_threshold = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.price.batch_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.market.endpoint = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.rate_limits.fallback.refill_per_second = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[health]\nthreshold = 0.9").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.health.threshold, 0.9);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.price.endpoint, EngineConfig::default().price.endpoint);
    }
}
