//! User repository.
//!
//! User accounts belong to the authentication layer; this table only mirrors
//! identity and creation order, which is all the administrator seeder needs.

use super::{DbError, is_unique_violation, now};
use sqlx::SqlitePool;

/// A user known to the access control engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub timecreated: i64,
}

/// Repository for user lookups.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a user.
    pub async fn create(&self, username: &str) -> Result<User, DbError> {
        let now = now();
        let result = sqlx::query("INSERT INTO users (username, timecreated) VALUES (?, ?)")
            .bind(username)
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return DbError::UserExists(username.to_string());
                }
                DbError::from(e)
            })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            timecreated: now,
        })
    }

    /// Id of the earliest-created user (smallest id), if any.
    pub async fn earliest_id(&self) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(id) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(id)
    }
}
