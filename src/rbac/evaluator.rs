//! Permission evaluator.
//!
//! Answers "does user U have capability C?" for one request. The user's
//! grants for C's component are fetched once, folded into a permission map
//! and cached together with each boolean decision.
//!
//! # Precedence
//!
//! Grant rows are folded in store order: component-scoped assignments
//! first, then ascending role sortorder, then ascending role id. The first
//! non-notset permission seen for a capability wins, except that `prohibit`
//! from any applicable role is final.

use super::cache::{AccessCache, ResolvedPermissions};
use super::capability::{CapabilityName, Permission};
use super::store::GrantStore;
use crate::db::{DbError, Grant};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, trace};

/// Fold ordered grant rows into one permission per capability.
pub fn fold_grants<'a, I>(grants: I) -> ResolvedPermissions
where
    I: IntoIterator<Item = &'a Grant>,
{
    let mut resolved = ResolvedPermissions::new();

    for grant in grants {
        let permission = match Permission::parse(&grant.permission) {
            None | Some(Permission::NotSet) => continue,
            Some(permission) => permission,
        };

        match resolved.entry(grant.capability.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(permission);
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() == Permission::Prohibit {
                    continue;
                }
                if permission == Permission::Prohibit {
                    slot.insert(Permission::Prohibit);
                }
            }
        }
    }

    resolved
}

/// Request-scoped permission evaluator.
///
/// Construct one per request, or call [`PermissionEvaluator::reset`] at the
/// request boundary when an instance is reused.
pub struct PermissionEvaluator {
    store: Arc<dyn GrantStore>,
    cache: Arc<AccessCache>,
}

impl PermissionEvaluator {
    /// Create an evaluator with empty caches.
    pub fn new(store: Arc<dyn GrantStore>) -> Self {
        Self::with_cache(store, Arc::new(AccessCache::new()))
    }

    /// Create an evaluator over an existing cache.
    pub fn with_cache(store: Arc<dyn GrantStore>, cache: Arc<AccessCache>) -> Self {
        Self { store, cache }
    }

    /// The caches backing this evaluator. Hand this to the registry so a
    /// capability sync invalidates it.
    pub fn cache(&self) -> Arc<AccessCache> {
        Arc::clone(&self.cache)
    }

    /// Forget everything cached for the previous request.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Whether `user_id` holds `capability`.
    ///
    /// Returns `Ok(false)` without touching the cache or the store when the
    /// user id is not positive or the name is not `component:action`.
    /// Store failures are returned as errors rather than reported as denial.
    pub async fn user_has_capability(
        &self,
        capability: &str,
        user_id: i64,
    ) -> Result<bool, DbError> {
        if user_id <= 0 {
            return Ok(false);
        }
        let Some(name) = CapabilityName::parse(capability) else {
            return Ok(false);
        };
        let component = name.component();

        if let Some(allowed) = self.cache.decision(user_id, component, capability) {
            trace!(user_id, capability, allowed, "Permission decision cache hit");
            return Ok(allowed);
        }

        let resolved = self.resolved_permissions(user_id, component).await?;
        let permission = resolved.get(capability).copied().unwrap_or_default();
        let allowed = permission.grants();

        self.cache.store_decision(user_id, component, capability, allowed);
        if allowed {
            debug!(user_id, capability, "Capability granted");
        } else {
            debug!(user_id, capability, %permission, "Capability denied");
        }

        Ok(allowed)
    }

    /// The folded permission map for (user, component), building and
    /// caching it on first use.
    pub async fn resolved_permissions(
        &self,
        user_id: i64,
        component: &str,
    ) -> Result<Arc<ResolvedPermissions>, DbError> {
        if let Some(resolved) = self.cache.evaluation(user_id, component) {
            return Ok(resolved);
        }

        let grants = self.store.grants_for(user_id, component).await?;
        let resolved = fold_grants(&grants);
        trace!(
            user_id,
            component,
            rows = grants.len(),
            capabilities = resolved.len(),
            "Built permission evaluation cache"
        );

        Ok(self.cache.store_evaluation(user_id, component, resolved))
    }
}
