//! SQLite persistence for the RBAC tables.
//!
//! [`Database`] owns the pool and hands out one borrowing repository per
//! table: capabilities, roles (with their capability permissions), role
//! assignments and the user mirror the administrator seeder reads.

mod assignments;
mod capabilities;
mod roles;
mod users;

pub use assignments::{AssignmentRepository, Grant, RoleAssignment};
pub use capabilities::{CapabilityRecord, CapabilityRepository};
pub use roles::{NewRole, Role, RoleCapability, RoleRepository};
pub use users::{User, UserRepository};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Path that selects a private in-memory store.
pub const MEMORY_PATH: &str = ":memory:";

/// Pool size for file-backed stores. In-memory stores use a single connection.
const FILE_POOL_SIZE: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

static NEXT_MEMORY_STORE: AtomicU64 = AtomicU64::new(0);

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("role already exists: {0}")]
    RoleExists(String),
    #[error("role not found: {0}")]
    RoleNotFound(i64),
    #[error("user already exists: {0}")]
    UserExists(String),
    #[error("invalid component for a scoped assignment: {0:?}")]
    InvalidComponent(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Handle to the RBAC store. Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the store at `path` and bring its schema up to date.
    ///
    /// [`MEMORY_PATH`] opens a fresh in-memory store that no other call sees.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let (options, pool_size) = if path == MEMORY_PATH {
            (memory_options(), 1)
        } else {
            ensure_parent_dir(path);
            (file_options(path), FILE_POOL_SIZE)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(Some(IDLE_TIMEOUT))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(path = %path, "RBAC store ready");

        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn capabilities(&self) -> CapabilityRepository<'_> {
        CapabilityRepository::new(&self.pool)
    }

    pub fn roles(&self) -> RoleRepository<'_> {
        RoleRepository::new(&self.pool)
    }

    pub fn assignments(&self) -> AssignmentRepository<'_> {
        AssignmentRepository::new(&self.pool)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }
}

/// Shared-cache URI unique to this process and call, so parallel tests never
/// see each other's rows.
fn memory_options() -> SqliteConnectOptions {
    let id = NEXT_MEMORY_STORE.fetch_add(1, Ordering::Relaxed);
    SqliteConnectOptions::new()
        .filename(format!(
            "file:rolegate-{}-{id}?mode=memory&cache=shared",
            std::process::id()
        ))
        .shared_cache(true)
        .create_if_missing(true)
        .foreign_keys(true)
}

fn file_options(path: &str) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "Cannot create store directory");
    }
}

/// Current unix timestamp in seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// True when the error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
