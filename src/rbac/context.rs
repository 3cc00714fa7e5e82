//! Permission checks for the current request's user.

use super::evaluator::PermissionEvaluator;
use crate::db::DbError;
use thiserror::Error;
use tracing::info;

/// Errors from [`AccessContext::require_capability`].
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("user {user_id} lacks capability {capability}")]
    Denied { capability: String, user_id: i64 },
    #[error("no authenticated user")]
    NoCurrentUser,
    #[error("permission store unavailable: {0}")]
    Store(#[from] DbError),
}

/// Resolves the authenticated user of the current request.
pub trait CurrentUser: Send + Sync {
    /// The user id, or `None` for anonymous requests.
    fn user_id(&self) -> Option<i64>;
}

/// A fixed user, for tools and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUser(pub Option<i64>);

impl CurrentUser for FixedUser {
    fn user_id(&self) -> Option<i64> {
        self.0
    }
}

/// An evaluator bound to the current user.
pub struct AccessContext<'a> {
    evaluator: &'a PermissionEvaluator,
    user: &'a dyn CurrentUser,
}

impl<'a> AccessContext<'a> {
    pub fn new(evaluator: &'a PermissionEvaluator, user: &'a dyn CurrentUser) -> Self {
        Self { evaluator, user }
    }

    /// Whether the current user holds `capability`. Anonymous users hold nothing.
    pub async fn has_capability(&self, capability: &str) -> Result<bool, DbError> {
        match self.user.user_id() {
            Some(user_id) => self.evaluator.user_has_capability(capability, user_id).await,
            None => Ok(false),
        }
    }

    /// Fail unless the current user holds `capability`.
    pub async fn require_capability(&self, capability: &str) -> Result<(), AccessError> {
        let user_id = self.user.user_id().ok_or(AccessError::NoCurrentUser)?;
        if self.evaluator.user_has_capability(capability, user_id).await? {
            return Ok(());
        }
        info!(user_id, capability, "Access denied");
        Err(AccessError::Denied {
            capability: capability.to_string(),
            user_id,
        })
    }
}
