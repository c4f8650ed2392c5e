//! Engine configuration
//!
//! All settings are constructor parameters of the respective component;
//! nothing here is read lazily from a global. `load_config_from_path` builds
//! an `EngineConfig` that `MarketDataEngine::new` consumes.

#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    apply_env_overrides, load_config, load_config_from_path, parse_config, validate_config,
    CONFIG_FILE_PATH,
};
