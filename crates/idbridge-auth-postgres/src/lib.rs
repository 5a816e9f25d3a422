//! PostgreSQL storage backend for idbridge-auth.
//!
//! Provides persistent storage for:
//!
//! - OAuth clients (`oauth_clients`)
//! - Users provisioned from federated logins (`users`)
//! - Refresh token records, by fingerprint (`refresh_tokens`)
//! - The access token revocation ledger (`revoked_tokens`)
//!
//! Tables are created by the embedded migrations in [`migrations`].
//!
//! # Example
//!
//! ```ignore
//! use idbridge_auth_postgres::{PostgresAuthStorage, PostgresConfig};
//!
//! let storage = PostgresAuthStorage::connect(&PostgresConfig::new("postgres://localhost/idbridge")).await?;
//!
//! let clients = storage.clients();
//! let client = clients.find_by_client_id("my-app").await?;
//! ```

pub mod client;
pub mod config;
pub mod migrations;
pub mod pool;
pub mod refresh_token;
pub mod revoked_token;
pub mod user;

use std::sync::Arc;

use idbridge_auth::AuthError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use tracing::info;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use client::PostgresClientStorage;
pub use config::PostgresConfig;
pub use refresh_token::PostgresRefreshTokenStorage;
pub use revoked_token::PostgresRevokedTokenStorage;
pub use user::PostgresUserStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx_core::migrate::MigrateError),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a database or migration error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Migration(_))
    }

    /// Maps a unique-constraint violation to `Conflict`, everything else to
    /// `Database`.
    pub(crate) fn from_insert(err: sqlx_core::Error, what: impl Into<String>) -> Self {
        let unique_violation = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique_violation {
            Self::Conflict(format!("{} already exists", what.into()))
        } else {
            Self::Database(err)
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
///
/// Holds the connection pool and hands out the per-table storages, each of
/// which implements the matching `idbridge_auth::storage` trait.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connects to the database and, if configured, applies migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = pool::create_pool(config).await?;
        if config.run_migrations {
            migrations::run(&pool).await?;
        } else {
            info!("Skipping database migrations");
        }
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// Client storage.
    #[must_use]
    pub fn clients(&self) -> Arc<PostgresClientStorage> {
        Arc::new(PostgresClientStorage::new(Arc::clone(&self.pool)))
    }

    /// User storage.
    #[must_use]
    pub fn users(&self) -> Arc<PostgresUserStorage> {
        Arc::new(PostgresUserStorage::new(Arc::clone(&self.pool)))
    }

    /// Refresh token storage.
    #[must_use]
    pub fn refresh_tokens(&self) -> Arc<PostgresRefreshTokenStorage> {
        Arc::new(PostgresRefreshTokenStorage::new(Arc::clone(&self.pool)))
    }

    /// Revocation ledger storage.
    #[must_use]
    pub fn revoked_tokens(&self) -> Arc<PostgresRevokedTokenStorage> {
        Arc::new(PostgresRevokedTokenStorage::new(Arc::clone(&self.pool)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_conflict() {
        let err = StorageError::conflict("client 'demo' already exists");
        assert!(err.is_conflict());
        assert!(!err.is_database_error());
        assert_eq!(err.to_string(), "Conflict: client 'demo' already exists");
    }

    #[test]
    fn test_storage_error_not_found() {
        let err = StorageError::not_found("user 42");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_storage_error_database() {
        let err = StorageError::from(sqlx_core::Error::PoolTimedOut);
        assert!(err.is_database_error());
    }

    #[test]
    fn test_storage_error_into_auth_error() {
        let err: AuthError = StorageError::from(sqlx_core::Error::PoolClosed).into();
        assert!(err.is_server_error());
        assert_eq!(err.oauth_error_code(), "temporarily_unavailable");
    }
}
