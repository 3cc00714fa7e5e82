//! Integration test common infrastructure.
//!
//! Provides a fresh in-memory store and helpers for building roles and
//! declaration files.

#![allow(dead_code)]

use rolegate::Database;
use rolegate::db::NewRole;
use rolegate::rbac::Permission;
use std::path::PathBuf;

/// Fresh, migrated in-memory database.
pub async fn memory_db() -> Database {
    Database::new(":memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Create a role holding a single permission. Returns the role id.
pub async fn role_with(
    db: &Database,
    shortname: &str,
    sortorder: i64,
    capability: &str,
    permission: Permission,
) -> i64 {
    let role = db
        .roles()
        .create(NewRole {
            name: shortname,
            shortname,
            description: "",
            sortorder,
        })
        .await
        .expect("Failed to create role");
    db.roles()
        .set_capability(role.id, capability, permission)
        .await
        .expect("Failed to set role capability");
    role.id
}

/// Write a module declaration file into `dir` and return its path.
pub fn write_declarations(dir: &tempfile::TempDir, module: &str, content: &str) -> PathBuf {
    let module_dir = dir.path().join(module);
    std::fs::create_dir_all(&module_dir).expect("Failed to create module directory");
    let path = module_dir.join("capabilities.toml");
    std::fs::write(&path, content).expect("Failed to write declarations");
    path
}
