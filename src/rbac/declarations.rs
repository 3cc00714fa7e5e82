//! Capability declaration sources.
//!
//! Every component (core feature areas and installed modules) contributes a
//! [`DeclarationSource`]. The registry iterates the sources it was given at
//! startup; nothing is discovered by scanning the filesystem.
//!
//! Module sources are TOML files of the form:
//!
//! ```toml
//! [capabilities."blog:post"]
//! captype = "write"
//!
//! [capabilities."blog:view"]
//! captype = "read"
//! ```

use super::capability::CapType;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors reading a declaration source. The registry skips the source.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{path} has no [capabilities] table")]
    MissingTable { path: PathBuf },
}

/// A single declared capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDeclaration {
    pub name: String,
    pub captype: CapType,
}

impl CapabilityDeclaration {
    pub fn new(name: impl Into<String>, captype: CapType) -> Self {
        Self {
            name: name.into(),
            captype,
        }
    }
}

/// Something that yields capability declarations for one component.
pub trait DeclarationSource: Send + Sync {
    /// Label of the contributing component, for logs and reports.
    fn component(&self) -> &str;

    /// The declarations this component makes.
    fn declarations(&self) -> Result<Vec<CapabilityDeclaration>, DeclarationError>;
}

/// Declarations registered in code.
#[derive(Debug, Clone)]
pub struct StaticDeclarations {
    component: String,
    entries: Vec<CapabilityDeclaration>,
}

impl StaticDeclarations {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            entries: Vec::new(),
        }
    }

    /// Declare a read capability.
    pub fn read(mut self, name: impl Into<String>) -> Self {
        self.entries.push(CapabilityDeclaration::new(name, CapType::Read));
        self
    }

    /// Declare a write capability.
    pub fn write(mut self, name: impl Into<String>) -> Self {
        self.entries.push(CapabilityDeclaration::new(name, CapType::Write));
        self
    }
}

impl DeclarationSource for StaticDeclarations {
    fn component(&self) -> &str {
        &self.component
    }

    fn declarations(&self) -> Result<Vec<CapabilityDeclaration>, DeclarationError> {
        Ok(self.entries.clone())
    }
}

/// Capabilities owned by the access control engine itself.
pub fn core_declarations() -> StaticDeclarations {
    StaticDeclarations::new("rbac")
        .write("rbac:manage")
        .read("rbac:view")
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    captype: CapType,
}

/// Declarations read from a module's TOML file.
#[derive(Debug, Clone)]
pub struct TomlDeclarations {
    component: String,
    path: PathBuf,
}

impl TomlDeclarations {
    pub fn new(component: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            component: component.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse declaration text. Entries without a valid `captype` are dropped.
    fn parse(&self, content: &str) -> Result<Vec<CapabilityDeclaration>, DeclarationError> {
        let mut document: toml::Table =
            toml::from_str(content).map_err(|source| DeclarationError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let Some(toml::Value::Table(capabilities)) = document.remove("capabilities") else {
            return Err(DeclarationError::MissingTable {
                path: self.path.clone(),
            });
        };

        let mut out = Vec::with_capacity(capabilities.len());
        for (name, value) in capabilities {
            match value.try_into::<Descriptor>() {
                Ok(descriptor) => out.push(CapabilityDeclaration::new(name, descriptor.captype)),
                Err(e) => {
                    debug!(
                        component = %self.component,
                        capability = %name,
                        error = %e,
                        "Ignoring malformed declaration"
                    );
                }
            }
        }
        Ok(out)
    }
}

impl DeclarationSource for TomlDeclarations {
    fn component(&self) -> &str {
        &self.component
    }

    fn declarations(&self) -> Result<Vec<CapabilityDeclaration>, DeclarationError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| DeclarationError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source_with(content: &str) -> (tempfile::NamedTempFile, TomlDeclarations) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let source = TomlDeclarations::new("blog", file.path());
        (file, source)
    }

    #[test]
    fn core_declares_rbac_capabilities() {
        let decls = core_declarations().declarations().unwrap();
        assert!(decls.contains(&CapabilityDeclaration::new("rbac:manage", CapType::Write)));
        assert!(decls.contains(&CapabilityDeclaration::new("rbac:view", CapType::Read)));
    }

    #[test]
    fn toml_source_reads_declarations() {
        let (_file, source) = source_with(
            r#"
[capabilities."blog:post"]
captype = "write"

[capabilities."blog:view"]
captype = "read"
"#,
        );
        let mut decls = source.declarations().unwrap();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            decls,
            vec![
                CapabilityDeclaration::new("blog:post", CapType::Write),
                CapabilityDeclaration::new("blog:view", CapType::Read),
            ]
        );
    }

    #[test]
    fn toml_source_drops_entries_without_valid_captype() {
        let (_file, source) = source_with(
            r#"
[capabilities."blog:post"]
captype = "execute"

[capabilities."blog:view"]
description = "no captype"

[capabilities."blog:edit"]
captype = "write"
"#,
        );
        let decls = source.declarations().unwrap();
        assert_eq!(decls, vec![CapabilityDeclaration::new("blog:edit", CapType::Write)]);
    }

    #[test]
    fn toml_source_reports_parse_errors() {
        let (_file, source) = source_with("[capabilities\nnot toml");
        assert!(matches!(
            source.declarations(),
            Err(DeclarationError::Parse { .. })
        ));
    }

    #[test]
    fn toml_source_reports_missing_table() {
        let (_file, source) = source_with("title = \"blog\"\n");
        assert!(matches!(
            source.declarations(),
            Err(DeclarationError::MissingTable { .. })
        ));
    }

    #[test]
    fn toml_source_reports_missing_file() {
        let source = TomlDeclarations::new("ghost", "/nonexistent/rolegate/capabilities.toml");
        assert!(matches!(source.declarations(), Err(DeclarationError::Io { .. })));
    }
}
