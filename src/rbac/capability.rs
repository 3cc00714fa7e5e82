//! Capability names, capability types and permission values.

use serde::Deserialize;
use std::fmt;

/// Separator between the owning component and the action in a capability name.
pub const COMPONENT_SEPARATOR: char = ':';

/// Whether a capability reads or mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapType {
    Read,
    Write,
}

impl CapType {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    /// Parse the database representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            _ => None,
        }
    }
}

impl fmt::Display for CapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission attached to a (role, capability) pair.
///
/// Only [`Permission::Allow`] grants access. [`Permission::Prohibit`] is an
/// absolute veto that no other role can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Permission {
    #[default]
    NotSet,
    Allow,
    Prevent,
    Prohibit,
}

impl Permission {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "notset",
            Self::Allow => "allow",
            Self::Prevent => "prevent",
            Self::Prohibit => "prohibit",
        }
    }

    /// Parse the database representation. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "notset" => Some(Self::NotSet),
            "allow" => Some(Self::Allow),
            "prevent" => Some(Self::Prevent),
            "prohibit" => Some(Self::Prohibit),
            _ => None,
        }
    }

    /// Whether this permission grants the capability.
    #[inline]
    pub fn grants(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `"<component>:<action>"` capability name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityName<'a> {
    name: &'a str,
    split: usize,
}

impl<'a> CapabilityName<'a> {
    /// Validate a capability name.
    ///
    /// Returns `None` unless the name contains exactly one `:` preceded by a
    /// non-empty component.
    pub fn parse(name: &'a str) -> Option<Self> {
        let split = name.find(COMPONENT_SEPARATOR)?;
        if split == 0 || name[split + 1..].contains(COMPONENT_SEPARATOR) {
            return None;
        }
        Some(Self { name, split })
    }

    /// The full capability name.
    pub fn as_str(&self) -> &'a str {
        self.name
    }

    /// The owning component (prefix before the separator).
    pub fn component(&self) -> &'a str {
        &self.name[..self.split]
    }

    /// The action (suffix after the separator).
    pub fn action(&self) -> &'a str {
        &self.name[self.split + 1..]
    }
}

impl fmt::Display for CapabilityName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_component_and_action() {
        let name = CapabilityName::parse("rbac:manage").unwrap();
        assert_eq!(name.component(), "rbac");
        assert_eq!(name.action(), "manage");
        assert_eq!(name.as_str(), "rbac:manage");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(CapabilityName::parse("notformatted").is_none());
    }

    #[test]
    fn parse_rejects_extra_separator() {
        assert!(CapabilityName::parse("a:b:c").is_none());
    }

    #[test]
    fn parse_rejects_empty_component() {
        assert!(CapabilityName::parse(":post").is_none());
        assert!(CapabilityName::parse(":").is_none());
    }

    #[test]
    fn only_allow_grants() {
        assert!(Permission::Allow.grants());
        assert!(!Permission::Prevent.grants());
        assert!(!Permission::Prohibit.grants());
        assert!(!Permission::NotSet.grants());
    }

    #[test]
    fn permission_parse_matches_as_str() {
        for perm in [
            Permission::NotSet,
            Permission::Allow,
            Permission::Prevent,
            Permission::Prohibit,
        ] {
            assert_eq!(Permission::parse(perm.as_str()), Some(perm));
        }
        assert_eq!(Permission::parse(""), None);
        assert_eq!(Permission::parse("deny"), None);
    }

    #[test]
    fn captype_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            captype: CapType,
        }
        let w: Wrapper = toml::from_str(r#"captype = "write""#).unwrap();
        assert_eq!(w.captype, CapType::Write);
        assert!(toml::from_str::<Wrapper>(r#"captype = "execute""#).is_err());
    }
}
