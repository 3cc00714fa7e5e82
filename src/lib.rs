//! rolegate - role-based access control for the admin console.
//!
//! Capabilities are declared per component, synced into a SQLite store,
//! bundled into roles and assigned to users globally or per component.
//! A request-scoped [`PermissionEvaluator`](rbac::PermissionEvaluator)
//! answers permission checks with at most one store query per
//! (user, component).

pub mod config;
pub mod db;
pub mod rbac;

pub use config::Config;
pub use db::{Database, DbError};
pub use rbac::{CapabilityRegistry, PermissionEvaluator, SyncReport};
