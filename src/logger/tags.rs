/// Log tags identify the subsystem a message comes from
///
/// Each tag has a display label (console column) and a debug key used by
/// `--debug <key>` to enable debug output for that subsystem only.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Api,
    Cache,
    RateLimit,
    Retry,
    PriceService,
    Metrics,
    Health,
    Events,
}

impl LogTag {
    /// Plain label without colors (file output, alignment)
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Api => "API".to_string(),
            LogTag::Cache => "CACHE".to_string(),
            LogTag::RateLimit => "RATELIMIT".to_string(),
            LogTag::Retry => "RETRY".to_string(),
            LogTag::PriceService => "PRICE".to_string(),
            LogTag::Metrics => "METRICS".to_string(),
            LogTag::Health => "AMMHEALTH".to_string(),
            LogTag::Events => "EVENTS".to_string(),
        }
    }

    /// Key matched against `--debug <key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Cache => "cache".to_string(),
            LogTag::RateLimit => "rate-limit".to_string(),
            LogTag::Retry => "retry".to_string(),
            LogTag::PriceService => "prices".to_string(),
            LogTag::Metrics => "metrics".to_string(),
            LogTag::Health => "health".to_string(),
            LogTag::Events => "events".to_string(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
