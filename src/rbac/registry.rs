//! Capability registry.
//!
//! Collects declarations from every registered component and upserts them
//! into the store. Sync is best-effort and idempotent: malformed names are
//! dropped, unreadable sources and failed writes are logged and skipped,
//! and the outcome is returned as a [`SyncReport`].

use super::cache::AccessCache;
use super::capability::CapabilityName;
use super::declarations::{DeclarationSource, core_declarations};
use super::seeder::{SeedOutcome, seed_default_admin_if_empty};
use super::store::UserDirectory;
use crate::config::SeedConfig;
use crate::db::Database;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A declaration source that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub component: String,
    pub reason: String,
}

/// A declaration whose upsert failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCapability {
    pub name: String,
    pub reason: String,
}

/// Outcome of [`CapabilityRegistry::sync_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Sources whose declarations were processed.
    pub sources: usize,
    pub skipped_sources: Vec<SkippedSource>,
    /// Capabilities written.
    pub registered: usize,
    /// Declarations dropped for a malformed name.
    pub rejected: usize,
    pub failed: Vec<FailedCapability>,
    pub seed: SeedOutcome,
}

impl SyncReport {
    /// True when every source was read and every capability written.
    pub fn is_clean(&self) -> bool {
        self.skipped_sources.is_empty()
            && self.failed.is_empty()
            && !matches!(self.seed, SeedOutcome::Failed { .. })
    }
}

/// Registry of capability declaration sources.
pub struct CapabilityRegistry {
    db: Database,
    users: Arc<dyn UserDirectory>,
    seed: SeedConfig,
    sources: Vec<Box<dyn DeclarationSource>>,
    caches: Vec<Arc<AccessCache>>,
}

impl CapabilityRegistry {
    /// Create a registry that already includes the core declarations.
    pub fn new(db: Database, seed: SeedConfig) -> Self {
        let users: Arc<dyn UserDirectory> = Arc::new(db.clone());
        Self {
            db,
            users,
            seed,
            sources: vec![Box::new(core_declarations())],
            caches: Vec::new(),
        }
    }

    /// Use a different user directory for seeding.
    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    /// Register a component's declaration source.
    pub fn register(&mut self, source: impl DeclarationSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Register a boxed declaration source.
    pub fn register_boxed(&mut self, source: Box<dyn DeclarationSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Cache to clear on every sync.
    pub fn attach_cache(&mut self, cache: Arc<AccessCache>) -> &mut Self {
        self.caches.push(cache);
        self
    }

    /// The registered declaration sources, core first.
    pub fn discover_declarations(&self) -> &[Box<dyn DeclarationSource>] {
        &self.sources
    }

    /// Upsert every declared capability, then seed the default administrator.
    pub async fn sync_all(&self) -> SyncReport {
        for cache in &self.caches {
            cache.clear();
        }

        let mut sources = 0;
        let mut skipped_sources = Vec::new();
        let mut registered = 0;
        let mut rejected = 0;
        let mut failed = Vec::new();

        for source in &self.sources {
            let declarations = match source.declarations() {
                Ok(declarations) => declarations,
                Err(e) => {
                    warn!(
                        component = %source.component(),
                        error = %e,
                        "Skipping capability declaration source"
                    );
                    skipped_sources.push(SkippedSource {
                        component: source.component().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            sources += 1;

            for declaration in &declarations {
                let Some(name) = CapabilityName::parse(&declaration.name) else {
                    debug!(
                        component = %source.component(),
                        capability = %declaration.name,
                        "Rejecting malformed capability name"
                    );
                    rejected += 1;
                    continue;
                };

                match self
                    .db
                    .capabilities()
                    .upsert(name.as_str(), declaration.captype, name.component())
                    .await
                {
                    Ok(()) => registered += 1,
                    Err(e) => {
                        warn!(capability = %name, error = %e, "Failed to register capability");
                        failed.push(FailedCapability {
                            name: name.as_str().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let seed = seed_default_admin_if_empty(&self.db, self.users.as_ref(), &self.seed).await;

        info!(
            sources,
            skipped = skipped_sources.len(),
            registered,
            rejected,
            failed = failed.len(),
            "Capability sync complete"
        );

        SyncReport {
            sources,
            skipped_sources,
            registered,
            rejected,
            failed,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::{CapType, Permission, StaticDeclarations, TomlDeclarations};

    async fn registry() -> (Database, CapabilityRegistry) {
        let db = Database::new(":memory:").await.unwrap();
        let registry = CapabilityRegistry::new(db.clone(), SeedConfig::default());
        (db, registry)
    }

    #[tokio::test]
    async fn core_capabilities_are_always_discovered() {
        let (_, registry) = registry().await;
        let components: Vec<_> = registry
            .discover_declarations()
            .iter()
            .map(|s| s.component().to_string())
            .collect();
        assert_eq!(components, vec!["rbac"]);
    }

    #[tokio::test]
    async fn sync_registers_valid_and_rejects_malformed() {
        let (db, mut registry) = registry().await;
        registry.register(
            StaticDeclarations::new("blog")
                .write("blog:post")
                .read("blogview")
                .read("blog:view:all"),
        );

        let report = registry.sync_all().await;
        assert_eq!(report.sources, 2);
        assert_eq!(report.registered, 3);
        assert_eq!(report.rejected, 2);
        assert!(report.is_clean());

        let post = db.capabilities().find("blog:post").await.unwrap().unwrap();
        assert_eq!(post.component, "blog");
        assert_eq!(post.captype, CapType::Write);
        assert!(db.capabilities().find("blogview").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_source_is_skipped() {
        let (db, mut registry) = registry().await;
        registry.register(TomlDeclarations::new("ghost", "/nonexistent/ghost/capabilities.toml"));
        registry.register(StaticDeclarations::new("blog").write("blog:post"));

        let report = registry.sync_all().await;
        assert_eq!(report.skipped_sources.len(), 1);
        assert_eq!(report.skipped_sources[0].component, "ghost");
        assert!(!report.is_clean());
        assert!(db.capabilities().find("blog:post").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sync_is_idempotent() {
        let (db, mut registry) = registry().await;
        registry.register(StaticDeclarations::new("blog").write("blog:post").read("blog:view"));

        registry.sync_all().await;
        let first = db.capabilities().list_all().await.unwrap();
        registry.sync_all().await;
        let second = db.capabilities().list_all().await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.captype, b.captype);
            assert_eq!(a.component, b.component);
            assert_eq!(a.timecreated, b.timecreated);
            assert!(b.timemodified >= a.timemodified);
        }
    }

    #[tokio::test]
    async fn first_sync_seeds_once() {
        let (db, registry) = registry().await;
        let root = db.users().create("root").await.unwrap();

        let first = registry.sync_all().await;
        let SeedOutcome::Seeded { assigned_user, .. } = first.seed else {
            panic!("expected seeding, got {:?}", first.seed);
        };
        assert_eq!(assigned_user, Some(root.id));

        let second = registry.sync_all().await;
        assert_eq!(second.seed, SeedOutcome::AlreadySeeded { roles: 1 });
        assert_eq!(db.roles().count().await.unwrap(), 1);

        let admin = db.roles().find_by_shortname("admin").await.unwrap().unwrap();
        let perms = db.roles().list_capabilities(admin.id).await.unwrap();
        let manage = perms.iter().find(|p| p.capability == "rbac:manage").unwrap();
        assert_eq!(manage.permission, Permission::Allow);
    }

    #[tokio::test]
    async fn failed_upsert_skips_only_that_capability() {
        let (db, mut registry) = registry().await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_blog_broken BEFORE INSERT ON capabilities
            WHEN NEW.name = 'blog:broken'
            BEGIN
                SELECT RAISE(ABORT, 'blog:broken is read-only');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();
        registry.register(
            StaticDeclarations::new("blog")
                .write("blog:post")
                .write("blog:broken")
                .read("blog:view"),
        );

        let report = registry.sync_all().await;
        assert_eq!(report.sources, 2);
        // rbac:manage, rbac:view, blog:post, blog:view
        assert_eq!(report.registered, 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "blog:broken");
        assert!(report.failed[0].reason.contains("read-only"));
        assert!(!report.is_clean());

        assert!(db.capabilities().find("blog:broken").await.unwrap().is_none());
        assert!(db.capabilities().find("blog:view").await.unwrap().is_some());
        assert!(matches!(report.seed, SeedOutcome::Seeded { capabilities: 4, .. }));
    }

    #[tokio::test]
    async fn failed_seeding_still_reports_sync() {
        let (db, mut registry) = registry().await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_roles BEFORE INSERT ON roles
            BEGIN
                SELECT RAISE(ABORT, 'roles are locked');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();
        registry.register(StaticDeclarations::new("blog").write("blog:post"));

        let report = registry.sync_all().await;
        assert_eq!(report.sources, 2);
        assert_eq!(report.registered, 3);
        assert!(report.failed.is_empty());
        let SeedOutcome::Failed { reason } = &report.seed else {
            panic!("expected seeding to fail, got {:?}", report.seed);
        };
        assert!(reason.contains("creating role"));
        assert!(!report.is_clean());

        assert_eq!(db.capabilities().count().await.unwrap(), 3);
        assert_eq!(db.roles().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sync_clears_attached_caches() {
        let (_, mut registry) = registry().await;
        let cache = Arc::new(AccessCache::new());
        cache.store_decision(7, "blog", "blog:post", true);
        registry.attach_cache(Arc::clone(&cache));

        registry.sync_all().await;
        assert_eq!(cache.decision_count(), 0);
    }
}
