//! Role assignment repository.
//!
//! Binds users to roles, globally or scoped to a single component, and
//! produces the ordered grant rows the permission evaluator folds.

use super::{DbError, now};
use sqlx::SqlitePool;

/// Stored component value for a global assignment.
const GLOBAL: &str = "";

/// A user's role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub userid: i64,
    pub roleid: i64,
    /// `None` applies to every component.
    pub component: Option<String>,
    pub timecreated: i64,
    pub timemodified: i64,
}

/// One (assignment, role capability) row applicable to a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub roleid: i64,
    pub sortorder: i64,
    /// True for component-scoped assignments.
    pub scoped: bool,
    pub capability: String,
    /// Raw stored permission; unknown or empty values are folded as notset.
    pub permission: String,
}

/// Stored component value for an assignment context.
///
/// A scoped assignment needs a non-empty component; `Some("")` would be stored
/// exactly like a global assignment.
fn component_key(component: Option<&str>) -> Result<&str, DbError> {
    match component {
        None => Ok(GLOBAL),
        Some(c) if c.is_empty() => Err(DbError::InvalidComponent(c.to_string())),
        Some(c) => Ok(c),
    }
}

/// Repository for role assignment operations.
pub struct AssignmentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AssignmentRepository<'a> {
    /// Create a new assignment repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Assign a role to a user. Re-assigning refreshes `timemodified`.
    ///
    /// Fails with [`DbError::InvalidComponent`] for `Some("")`.
    pub async fn assign(
        &self,
        userid: i64,
        roleid: i64,
        component: Option<&str>,
    ) -> Result<(), DbError> {
        let component = component_key(component)?;
        let now = now();
        sqlx::query(
            r#"
            INSERT INTO role_assignment (userid, roleid, component, timecreated, timemodified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(userid, roleid, component) DO UPDATE SET
                timemodified = excluded.timemodified
            "#,
        )
        .bind(userid)
        .bind(roleid)
        .bind(component)
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

    /// Remove a role assignment. Returns true if a row was deleted.
    pub async fn unassign(
        &self,
        userid: i64,
        roleid: i64,
        component: Option<&str>,
    ) -> Result<bool, DbError> {
        let component = component_key(component)?;
        let result = sqlx::query(
            "DELETE FROM role_assignment WHERE userid = ? AND roleid = ? AND component = ?",
        )
        .bind(userid)
        .bind(roleid)
        .bind(component)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List every assignment held by a user.
    pub async fn list_for_user(&self, userid: i64) -> Result<Vec<RoleAssignment>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, i64, i64)>(
            r#"
            SELECT userid, roleid, component, timecreated, timemodified
            FROM role_assignment
            WHERE userid = ?
            ORDER BY id
            "#,
        )
        .bind(userid)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(userid, roleid, component, timecreated, timemodified)| RoleAssignment {
                    userid,
                    roleid,
                    component: (!component.is_empty()).then_some(component),
                    timecreated,
                    timemodified,
                },
            )
            .collect())
    }

    /// Grant rows applicable to `userid` for capabilities of `component`.
    ///
    /// Rows come from global assignments and assignments scoped to
    /// `component`, in precedence order: scoped assignments first, then
    /// ascending role sortorder, then ascending role id.
    pub async fn grants_for(&self, userid: i64, component: &str) -> Result<Vec<Grant>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, bool, String, String)>(
            r#"
            SELECT r.id, r.sortorder, ra.component <> '' AS scoped, rc.capability, rc.permission
            FROM role_assignment ra
            JOIN roles r ON r.id = ra.roleid
            JOIN role_capabilities rc ON rc.roleid = ra.roleid
            WHERE ra.userid = ?
              AND (ra.component = '' OR ra.component = ?)
            ORDER BY scoped DESC, r.sortorder ASC, r.id ASC, rc.id ASC
            "#,
        )
        .bind(userid)
        .bind(component)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(roleid, sortorder, scoped, capability, permission)| Grant {
                    roleid,
                    sortorder,
                    scoped,
                    capability,
                    permission,
                },
            )
            .collect())
    }
}
