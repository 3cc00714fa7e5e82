//! Capability repository.
//!
//! The registry upserts declared capabilities here; rows are never deleted.

use super::{DbError, now};
use crate::rbac::CapType;
use sqlx::SqlitePool;

/// A registered capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRecord {
    pub name: String,
    pub captype: CapType,
    pub component: String,
    pub timecreated: i64,
    pub timemodified: i64,
}

type CapabilityRow = (String, String, String, i64, i64);

fn into_record(
    (name, captype, component, timecreated, timemodified): CapabilityRow,
) -> Result<CapabilityRecord, DbError> {
    let captype = CapType::parse(&captype)
        .ok_or_else(|| DbError::Internal(format!("invalid captype '{captype}' for {name}")))?;
    Ok(CapabilityRecord {
        name,
        captype,
        component,
        timecreated,
        timemodified,
    })
}

/// Repository for capability operations.
pub struct CapabilityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CapabilityRepository<'a> {
    /// Create a new capability repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a capability or refresh an existing one.
    ///
    /// `timecreated` is kept on update; `timemodified` is always refreshed.
    pub async fn upsert(
        &self,
        name: &str,
        captype: CapType,
        component: &str,
    ) -> Result<(), DbError> {
        let now = now();
        sqlx::query(
            r#"
            INSERT INTO capabilities (name, captype, component, timecreated, timemodified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                captype = excluded.captype,
                component = excluded.component,
                timemodified = excluded.timemodified
            "#,
        )
        .bind(name)
        .bind(captype.as_str())
        .bind(component)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Find a capability by name.
    pub async fn find(&self, name: &str) -> Result<Option<CapabilityRecord>, DbError> {
        let row = sqlx::query_as::<_, CapabilityRow>(
            r#"
            SELECT name, captype, component, timecreated, timemodified
            FROM capabilities
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    /// List every registered capability, ordered by name.
    pub async fn list_all(&self) -> Result<Vec<CapabilityRecord>, DbError> {
        let rows = sqlx::query_as::<_, CapabilityRow>(
            r#"
            SELECT name, captype, component, timecreated, timemodified
            FROM capabilities
            ORDER BY name
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    /// List the capabilities owned by one component.
    pub async fn list_by_component(
        &self,
        component: &str,
    ) -> Result<Vec<CapabilityRecord>, DbError> {
        let rows = sqlx::query_as::<_, CapabilityRow>(
            r#"
            SELECT name, captype, component, timecreated, timemodified
            FROM capabilities
            WHERE component = ?
            ORDER BY name
            "#,
        )
        .bind(component)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    /// Number of registered capabilities.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM capabilities")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
