//! Skywave Config
//! ==============
//! Persistent application configuration for Skywave. The document is a JSON
//! tree held behind a mutex; loading self-heals structural drift against the
//! default schema, and saves are atomic so a failed write never clobbers a
//! previously valid file.

#![recursion_limit = "256"]

pub mod defaults;
pub mod manager;
pub mod migrate;
pub mod store;

pub use defaults::default_config;
pub use manager::{ConfigError, ConfigGuard, ConfigManager, LoadReport, AUTOSAVE_INTERVAL};
pub use migrate::{migrate, MODULE_INSTANCES_KEY};
pub use store::{read_config, write_config, LoadError, SaveError};
