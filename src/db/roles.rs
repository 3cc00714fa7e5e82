//! Role repository.
//!
//! Handles roles and the per-role capability permissions.

use super::{DbError, is_unique_violation, now};
use crate::rbac::Permission;
use sqlx::SqlitePool;

/// A role: a named bundle of capability permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub shortname: String,
    pub description: String,
    /// Lower sorts first and takes precedence.
    pub sortorder: i64,
    pub timecreated: i64,
    pub timemodified: i64,
}

/// Parameters for creating a role.
#[derive(Debug, Clone)]
pub struct NewRole<'a> {
    pub name: &'a str,
    pub shortname: &'a str,
    pub description: &'a str,
    pub sortorder: i64,
}

/// A permission stored for one (role, capability) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapability {
    pub roleid: i64,
    pub capability: String,
    pub permission: Permission,
}

type RoleRow = (i64, String, String, String, i64, i64, i64);

fn into_role(
    (id, name, shortname, description, sortorder, timecreated, timemodified): RoleRow,
) -> Role {
    Role {
        id,
        name,
        shortname,
        description,
        sortorder,
        timecreated,
        timemodified,
    }
}

/// Repository for role operations.
pub struct RoleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Create a new role repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a role. Fails with [`DbError::RoleExists`] on a duplicate shortname.
    pub async fn create(&self, role: NewRole<'_>) -> Result<Role, DbError> {
        let now = now();

        let result = sqlx::query(
            r#"
            INSERT INTO roles (name, shortname, description, sortorder, timecreated, timemodified)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(role.name)
        .bind(role.shortname)
        .bind(role.description)
        .bind(role.sortorder)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return DbError::RoleExists(role.shortname.to_string());
            }
            DbError::from(e)
        })?;

        Ok(Role {
            id: result.last_insert_rowid(),
            name: role.name.to_string(),
            shortname: role.shortname.to_string(),
            description: role.description.to_string(),
            sortorder: role.sortorder,
            timecreated: now,
            timemodified: now,
        })
    }

    /// Find role by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Role>, DbError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, shortname, description, sortorder, timecreated, timemodified
            FROM roles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(into_role))
    }

    /// Find role by its unique shortname.
    pub async fn find_by_shortname(&self, shortname: &str) -> Result<Option<Role>, DbError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, shortname, description, sortorder, timecreated, timemodified
            FROM roles
            WHERE shortname = ?
            "#,
        )
        .bind(shortname)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(into_role))
    }

    /// List all roles in precedence order (sortorder, then id).
    pub async fn list(&self) -> Result<Vec<Role>, DbError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, shortname, description, sortorder, timecreated, timemodified
            FROM roles
            ORDER BY sortorder ASC, id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(into_role).collect())
    }

    /// Number of roles on record.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Set the permission a role holds for a capability.
    ///
    /// Re-asserting an existing (role, capability) pair updates it in place.
    /// The capability does not have to be registered yet.
    pub async fn set_capability(
        &self,
        roleid: i64,
        capability: &str,
        permission: Permission,
    ) -> Result<(), DbError> {
        let now = now();
        sqlx::query(
            r#"
            INSERT INTO role_capabilities (roleid, capability, permission, timecreated, timemodified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(roleid, capability) DO UPDATE SET
                permission = excluded.permission,
                timemodified = excluded.timemodified
            "#,
        )
        .bind(roleid)
        .bind(capability)
        .bind(permission.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return DbError::RoleNotFound(roleid);
            }
            DbError::from(e)
        })?;

        Ok(())
    }

    /// Remove a role's permission for a capability. Returns true if a row was deleted.
    pub async fn remove_capability(&self, roleid: i64, capability: &str) -> Result<bool, DbError> {
        let result =
            sqlx::query("DELETE FROM role_capabilities WHERE roleid = ? AND capability = ?")
                .bind(roleid)
                .bind(capability)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the permissions held by a role.
    pub async fn list_capabilities(&self, roleid: i64) -> Result<Vec<RoleCapability>, DbError> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            r#"
            SELECT roleid, capability, permission
            FROM role_capabilities
            WHERE roleid = ?
            ORDER BY capability
            "#,
        )
        .bind(roleid)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(roleid, capability, permission)| RoleCapability {
                roleid,
                capability,
                permission: Permission::parse(&permission).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn role<'a>(shortname: &'a str, sortorder: i64) -> NewRole<'a> {
        NewRole {
            name: shortname,
            shortname,
            description: "",
            sortorder,
        }
    }

    #[tokio::test]
    async fn create_and_find_role() {
        let db = Database::new(":memory:").await.unwrap();
        let created = db.roles().create(role("editor", 3)).await.unwrap();

        let found = db.roles().find_by_shortname("editor").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(db.roles().find_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(db.roles().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_shortname_is_rejected() {
        let db = Database::new(":memory:").await.unwrap();
        db.roles().create(role("editor", 0)).await.unwrap();

        let err = db.roles().create(role("editor", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::RoleExists(ref s) if s == "editor"));
    }

    #[tokio::test]
    async fn list_orders_by_sortorder_then_id() {
        let db = Database::new(":memory:").await.unwrap();
        db.roles().create(role("b", 5)).await.unwrap();
        db.roles().create(role("a", 1)).await.unwrap();
        db.roles().create(role("c", 5)).await.unwrap();

        let names: Vec<_> = db
            .roles()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.shortname)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn set_capability_updates_in_place() {
        let db = Database::new(":memory:").await.unwrap();
        let editor = db.roles().create(role("editor", 0)).await.unwrap();

        db.roles()
            .set_capability(editor.id, "blog:post", Permission::Allow)
            .await
            .unwrap();
        db.roles()
            .set_capability(editor.id, "blog:post", Permission::Prohibit)
            .await
            .unwrap();

        let caps = db.roles().list_capabilities(editor.id).await.unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].permission, Permission::Prohibit);

        assert!(db.roles().remove_capability(editor.id, "blog:post").await.unwrap());
        assert!(db.roles().list_capabilities(editor.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_capability_for_missing_role_fails() {
        let db = Database::new(":memory:").await.unwrap();
        let err = db
            .roles()
            .set_capability(42, "blog:post", Permission::Allow)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RoleNotFound(42)));
    }
}
