//! Request-scoped permission caches.

use super::capability::Permission;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Folded permissions for one (user, component): capability name to permission.
pub type ResolvedPermissions = HashMap<String, Permission>;

/// The evaluation and decision caches for one request.
///
/// Entries are keyed by user id, so a cache shared between concurrent checks
/// for different users stays correct. It must still be cleared at request
/// boundaries, and is cleared by every capability sync.
#[derive(Debug, Default)]
pub struct AccessCache {
    evaluations: DashMap<(i64, String), Arc<ResolvedPermissions>>,
    decisions: DashMap<(i64, String, String), bool>,
}

impl AccessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn evaluation(
        &self,
        user_id: i64,
        component: &str,
    ) -> Option<Arc<ResolvedPermissions>> {
        self.evaluations
            .get(&(user_id, component.to_string()))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn store_evaluation(
        &self,
        user_id: i64,
        component: &str,
        resolved: ResolvedPermissions,
    ) -> Arc<ResolvedPermissions> {
        let resolved = Arc::new(resolved);
        self.evaluations
            .insert((user_id, component.to_string()), Arc::clone(&resolved));
        resolved
    }

    pub(crate) fn decision(&self, user_id: i64, component: &str, capability: &str) -> Option<bool> {
        self.decisions
            .get(&(user_id, component.to_string(), capability.to_string()))
            .map(|entry| *entry.value())
    }

    pub(crate) fn store_decision(
        &self,
        user_id: i64,
        component: &str,
        capability: &str,
        allowed: bool,
    ) {
        self.decisions.insert(
            (user_id, component.to_string(), capability.to_string()),
            allowed,
        );
    }

    /// Drop every cached evaluation and decision.
    pub fn clear(&self) {
        self.evaluations.clear();
        self.decisions.clear();
    }

    /// Number of (user, component) evaluations currently cached.
    pub fn evaluation_count(&self) -> usize {
        self.evaluations.len()
    }

    /// Number of cached decisions.
    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }
}
