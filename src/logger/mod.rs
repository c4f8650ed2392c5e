//! Structured logging for the market-data engine
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via `--debug <key>` / `--debug-<key>`
//! - Dual output: colored console + optional file persistence
//!
//! ## Usage
//!
//! ```rust
//! use market_engine::logger::{self, LogTag};
//!
//! logger::error(LogTag::Api, "Connection failed");
//! logger::warning(LogTag::RateLimit, "Bucket drained, waiting");
//! logger::info(LogTag::PriceService, "Fetched 250 prices");
//! logger::debug(LogTag::Cache, "Cache hit for prices:SOL,USDC"); // Only with --debug cache
//! logger::verbose(LogTag::Api, "Raw response: ..."); // Only with --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, before any logging occurs:
//! ```rust
//! use market_engine::logger::{self, LoggerConfig};
//!
//! logger::init_with(LoggerConfig::default());
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::LoggerConfig;
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger with an explicit configuration
pub fn init_with(config: LoggerConfig) {
    config::set_logger_config(config);
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless filtered by level)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only when debug is enabled for the tag)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending file writes
///
/// Call during shutdown so the log file is complete.
pub fn flush() {
    file::flush_file_logging();
}
