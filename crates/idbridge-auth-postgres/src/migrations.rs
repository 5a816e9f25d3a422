//! Embedded schema migrations.
//!
//! The SQL files under `migrations/` are compiled into the binary and applied
//! through sqlx's migrator, which records progress in `_sqlx_migrations`.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use tracing::{info, instrument};

use crate::{PgPool, StorageResult};

/// (version, description, sql), in application order.
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    20250101000001,
    "initial_schema",
    include_str!("../migrations/20250101000001_initial_schema.sql"),
)];

fn build_migrations() -> Vec<Migration> {
    MIGRATIONS
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(*description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(*sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> StorageResult<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };
    migrator.run(pool).await?;

    info!("Database migrations completed");
    Ok(())
}
