pub mod amm;
pub mod apis;
pub mod cache;
pub mod config;
pub mod engine;
pub mod errors; // Structured error handling
pub mod events;
pub mod logger;
pub mod market;
pub mod pricing;
pub mod types;

pub use engine::MarketDataEngine;
pub use errors::{EngineError, EngineResult};
