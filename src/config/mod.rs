//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and TOML loading
//! - [`validation`]: startup validation

mod types;
mod validation;

pub use types::{
    Config, ConfigError, DatabaseConfig, LogFormat, LoggingConfig, ModuleConfig, SeedConfig,
};
pub use validation::{ValidationError, validate};
