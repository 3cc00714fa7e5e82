//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::rbac::{DeclarationSource, TomlDeclarations};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Default administrator seeding.
    #[serde(default)]
    pub seed: SeedConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Installed modules contributing capability declarations.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Declaration sources for the configured modules, in configuration order.
    pub fn module_sources(&self) -> Vec<Box<dyn DeclarationSource>> {
        self.modules
            .iter()
            .map(|module| {
                Box::new(TomlDeclarations::new(&module.component, &module.declarations))
                    as Box<dyn DeclarationSource>
            })
            .collect()
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Default administrator role created by the first capability sync.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Unique shortname of the role (default: "admin").
    #[serde(default = "default_admin_shortname")]
    pub admin_shortname: String,
    /// Display name (default: "Administrator").
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    #[serde(default = "default_admin_description")]
    pub admin_description: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_shortname: default_admin_shortname(),
            admin_name: default_admin_name(),
            admin_description: default_admin_description(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` overrides `level`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

/// An installed module and its declaration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Component name owning the module's capabilities (e.g. "blog").
    pub component: String,
    /// Path to the module's `capabilities.toml`.
    pub declarations: String,
}

fn default_database_path() -> String {
    "rolegate.db".to_string()
}

fn default_admin_shortname() -> String {
    "admin".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_admin_description() -> String {
    "Full access to every capability".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
