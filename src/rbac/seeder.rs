//! Default administrator seeding.
//!
//! The first capability sync on a store without roles creates an
//! administrator role allowing every registered capability and assigns it
//! globally to the earliest user. Once any role exists this is a no-op.

use super::capability::Permission;
use super::store::UserDirectory;
use crate::config::SeedConfig;
use crate::db::{Database, DbError, NewRole};
use tracing::{error, info, warn};

/// What the seeder did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Roles already existed; nothing was written.
    AlreadySeeded { roles: i64 },
    /// The administrator role was created.
    Seeded {
        role_id: i64,
        /// Capabilities granted `allow`.
        capabilities: usize,
        /// Capabilities whose grant failed to write.
        failed_capabilities: usize,
        /// The user assigned the role, if any user existed.
        assigned_user: Option<i64>,
    },
    /// Seeding stopped early. Logged, never fatal to the sync.
    Failed { reason: String },
}

impl SeedOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(reason = %reason, "Default administrator seeding failed");
        Self::Failed { reason }
    }
}

/// Create the default administrator role when no roles exist.
pub(crate) async fn seed_default_admin_if_empty(
    db: &Database,
    users: &dyn UserDirectory,
    config: &SeedConfig,
) -> SeedOutcome {
    let roles = match db.roles().count().await {
        Ok(count) => count,
        Err(e) => return SeedOutcome::failed(format!("counting roles: {e}")),
    };
    if roles > 0 {
        return SeedOutcome::AlreadySeeded { roles };
    }

    let role = match db
        .roles()
        .create(NewRole {
            name: &config.admin_name,
            shortname: &config.admin_shortname,
            description: &config.admin_description,
            sortorder: 0,
        })
        .await
    {
        Ok(role) => role,
        Err(e) => return SeedOutcome::failed(format!("creating role: {e}")),
    };

    let capabilities = match db.capabilities().list_all().await {
        Ok(capabilities) => capabilities,
        Err(e) => return SeedOutcome::failed(format!("listing capabilities: {e}")),
    };

    let mut granted = 0;
    let mut failed = 0;
    for capability in &capabilities {
        match db
            .roles()
            .set_capability(role.id, &capability.name, Permission::Allow)
            .await
        {
            Ok(()) => granted += 1,
            Err(e) => {
                failed += 1;
                warn!(
                    capability = %capability.name,
                    error = %e,
                    "Failed to grant capability to administrator role"
                );
            }
        }
    }

    let assigned_user = match assign_earliest_user(db, users, role.id).await {
        Ok(user) => user,
        Err(e) => {
            warn!(role = %role.shortname, error = %e, "Failed to assign administrator role");
            None
        }
    };

    info!(
        role = %role.shortname,
        capabilities = granted,
        user = ?assigned_user,
        "Seeded default administrator role"
    );

    SeedOutcome::Seeded {
        role_id: role.id,
        capabilities: granted,
        failed_capabilities: failed,
        assigned_user,
    }
}

async fn assign_earliest_user(
    db: &Database,
    users: &dyn UserDirectory,
    role_id: i64,
) -> Result<Option<i64>, DbError> {
    let Some(user_id) = users.earliest_user_id().await? else {
        return Ok(None);
    };
    db.assignments().assign(user_id, role_id, None).await?;
    Ok(Some(user_id))
}
