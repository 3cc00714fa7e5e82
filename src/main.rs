//! rolegate - operator tool for the access control engine.
//!
//! ```text
//! rolegate [config.toml] sync
//! rolegate [config.toml] check <capability> <user_id>
//! rolegate [config.toml] roles
//! ```

use anyhow::{Context, bail};
use rolegate::Database;
use rolegate::config::{self, Config, LogFormat};
use rolegate::rbac::{CapabilityRegistry, PermissionEvaluator, SeedOutcome};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "rolegate.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let explicit_config = args.first().is_some_and(|a| a.ends_with(".toml"));
    let config_path = if explicit_config {
        args.remove(0)
    } else {
        DEFAULT_CONFIG.to_string()
    };

    let config = if explicit_config || std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)
            .with_context(|| format!("failed to load config from {config_path}"))?
    } else {
        Config::default()
    };

    init_tracing(&config);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        bail!("configuration has {} error(s)", errors.len());
    }

    let db = Database::new(&config.database.path).await?;

    match args.first().map(String::as_str) {
        Some("sync") => sync(&config, db).await,
        Some("check") => {
            let capability = args.get(1).context("usage: check <capability> <user_id>")?;
            let user_id: i64 = args
                .get(2)
                .context("usage: check <capability> <user_id>")?
                .parse()
                .context("user_id must be an integer")?;
            check(db, capability, user_id).await
        }
        Some("roles") => roles(db).await,
        Some(other) => bail!("unknown command: {other}"),
        None => bail!(
            "usage: rolegate [config.toml] <sync | check <capability> <user_id> | roles>"
        ),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn sync(config: &Config, db: Database) -> anyhow::Result<()> {
    let mut registry = CapabilityRegistry::new(db, config.seed.clone());
    for source in config.module_sources() {
        registry.register_boxed(source);
    }

    let report = registry.sync_all().await;

    println!(
        "sources: {}, registered: {}, rejected: {}, failed: {}",
        report.sources,
        report.registered,
        report.rejected,
        report.failed.len()
    );
    for skipped in &report.skipped_sources {
        println!("skipped {}: {}", skipped.component, skipped.reason);
    }
    for failed in &report.failed {
        println!("failed {}: {}", failed.name, failed.reason);
    }
    match &report.seed {
        SeedOutcome::AlreadySeeded { .. } => {}
        SeedOutcome::Seeded {
            capabilities,
            assigned_user,
            ..
        } => match assigned_user {
            Some(user) => println!(
                "seeded '{}' with {capabilities} capabilities, assigned to user {user}",
                config.seed.admin_shortname
            ),
            None => println!(
                "seeded '{}' with {capabilities} capabilities, no user to assign",
                config.seed.admin_shortname
            ),
        },
        SeedOutcome::Failed { reason } => println!("seeding failed: {reason}"),
    }

    if !report.is_clean() {
        info!("Capability sync finished with skipped items");
    }
    Ok(())
}

async fn check(db: Database, capability: &str, user_id: i64) -> anyhow::Result<()> {
    let evaluator = PermissionEvaluator::new(Arc::new(db));
    let allowed = evaluator.user_has_capability(capability, user_id).await?;
    println!("{}", if allowed { "allow" } else { "deny" });
    Ok(())
}

async fn roles(db: Database) -> anyhow::Result<()> {
    for role in db.roles().list().await? {
        println!(
            "{:>4}  {:<16} {:>4}  {}",
            role.id, role.shortname, role.sortorder, role.name
        );
    }
    Ok(())
}
