//! Store seams used by the evaluator and the seeder.

use crate::db::{Database, DbError, Grant};
use async_trait::async_trait;

/// Source of grant rows for permission evaluation.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Grant rows applicable to `user_id` for capabilities of `component`,
    /// in precedence order (scoped first, then sortorder, then role id).
    async fn grants_for(&self, user_id: i64, component: &str) -> Result<Vec<Grant>, DbError>;
}

/// User lookup provided by the authentication layer.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Id of the earliest-created user, if any user exists.
    async fn earliest_user_id(&self) -> Result<Option<i64>, DbError>;
}

#[async_trait]
impl GrantStore for Database {
    async fn grants_for(&self, user_id: i64, component: &str) -> Result<Vec<Grant>, DbError> {
        self.assignments().grants_for(user_id, component).await
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn earliest_user_id(&self) -> Result<Option<i64>, DbError> {
        self.users().earliest_id().await
    }
}
