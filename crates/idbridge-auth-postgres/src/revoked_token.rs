//! Revocation ledger storage.
//!
//! Each entry holds a token fingerprint and the expiry of the token it
//! covers. Once that expiry passes the token is dead anyway, so lookups
//! ignore the entry and the sweep deletes it.

use std::sync::Arc;

use async_trait::async_trait;
use idbridge_auth::AuthResult;
use idbridge_auth::storage::RevokedTokenStorage;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;

use crate::{PgPool, StorageError};

/// Ledger entries in the `revoked_tokens` table.
#[derive(Debug, Clone)]
pub struct PostgresRevokedTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRevokedTokenStorage {
    /// Creates a ledger storage over the pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Number of ledger entries, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM revoked_tokens")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RevokedTokenStorage for PostgresRevokedTokenStorage {
    async fn revoke(&self, fingerprint: &str, expires_at: OffsetDateTime) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO revoked_tokens (fingerprint, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (fingerprint)
            DO UPDATE SET expires_at = GREATEST(revoked_tokens.expires_at, EXCLUDED.expires_at)
            "#,
        )
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> AuthResult<bool> {
        let revoked: bool = query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM revoked_tokens
                WHERE fingerprint = $1 AND expires_at > NOW()
            )
            "#,
        )
        .bind(fingerprint)
        .fetch_one(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(revoked)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
            .execute(&*self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
