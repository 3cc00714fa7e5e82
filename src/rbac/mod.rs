//! Role-based access control engine.
//!
//! - [`capability`]: capability names, capability types and permission values
//! - [`declarations`]: per-component capability declaration sources
//! - [`registry`]: capability sync into the store
//! - [`seeder`]: one-time default administrator role
//! - [`evaluator`]: per-request permission resolution with caching
//! - [`context`]: checks against the current request's user
//!
//! # Usage
//!
//! ```ignore
//! let evaluator = PermissionEvaluator::new(Arc::new(db.clone()));
//! if evaluator.user_has_capability("rbac:manage", user_id).await? {
//!     // ...
//! }
//! ```

pub mod cache;
pub mod capability;
pub mod context;
pub mod declarations;
pub mod evaluator;
pub mod registry;
pub mod seeder;
pub mod store;

pub use cache::{AccessCache, ResolvedPermissions};
pub use capability::{CapType, CapabilityName, Permission};
pub use context::{AccessContext, AccessError, CurrentUser, FixedUser};
pub use declarations::{
    CapabilityDeclaration, DeclarationError, DeclarationSource, StaticDeclarations,
    TomlDeclarations, core_declarations,
};
pub use evaluator::{PermissionEvaluator, fold_grants};
pub use registry::{CapabilityRegistry, FailedCapability, SkippedSource, SyncReport};
pub use seeder::SeedOutcome;
pub use store::{GrantStore, UserDirectory};
