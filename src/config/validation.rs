//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::db::MEMORY_PATH;
use crate::rbac::capability::COMPONENT_SEPARATOR;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("database.path is required")]
    MissingDatabasePath,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("seed.admin_shortname is required")]
    MissingAdminShortname,
    #[error("modules: component name is required")]
    MissingComponent,
    #[error("modules: component '{0}' must not contain ':'")]
    InvalidComponent(String),
    #[error("modules: component '{0}' is listed more than once")]
    DuplicateComponent(String),
    #[error("modules: declarations file for '{component}' does not exist: {path}")]
    DeclarationsNotFound { component: String, path: String },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let db_path = config.database.path.as_str();
    if db_path.is_empty() {
        errors.push(ValidationError::MissingDatabasePath);
    } else if db_path != MEMORY_PATH
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(db_path.to_string()));
    }

    if config.seed.admin_shortname.trim().is_empty() {
        errors.push(ValidationError::MissingAdminShortname);
    }

    let mut seen = HashSet::new();
    for module in &config.modules {
        if module.component.is_empty() {
            errors.push(ValidationError::MissingComponent);
            continue;
        }
        if module.component.contains(COMPONENT_SEPARATOR) {
            errors.push(ValidationError::InvalidComponent(module.component.clone()));
        }
        if !seen.insert(module.component.as_str()) {
            errors.push(ValidationError::DuplicateComponent(module.component.clone()));
        }
        if !Path::new(&module.declarations).exists() {
            errors.push(ValidationError::DeclarationsNotFound {
                component: module.component.clone(),
                path: module.declarations.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
