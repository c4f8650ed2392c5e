/// Logger configuration and per-tag debug filtering
///
/// The logger is the only process-wide state in the crate: engine components
/// are constructed explicitly, but log filtering is global so any module can
/// log without threading a handle through every call.
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped (Debug/Verbose have extra gates)
    pub min_level: LogLevel,
    /// Tags with debug output enabled (debug keys, e.g. "prices")
    pub debug_tags: HashSet<String>,
    /// Optional plain-text log file
    pub log_file: Option<PathBuf>,
    /// Write to stdout
    pub console: bool,
    /// Colorize console output
    pub colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            log_file: None,
            console: true,
            colors: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    config.debug_tags.contains("all") || config.debug_tags.contains(&tag.to_debug_key())
}
