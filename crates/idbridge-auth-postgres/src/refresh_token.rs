//! Refresh token record storage.
//!
//! Records are keyed by the token's SHA-256 fingerprint; the raw token is
//! never written.

use std::sync::Arc;

use async_trait::async_trait;
use idbridge_auth::AuthResult;
use idbridge_auth::storage::RefreshTokenStorage;
use idbridge_auth::types::RefreshToken;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{PgPool, StorageError};

type RefreshTokenTuple = (
    Uuid,
    String,
    String,
    String,
    String,
    OffsetDateTime,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

fn row_to_token(row: RefreshTokenTuple) -> RefreshToken {
    let (id, token_hash, client_id, user_id, scope, created_at, expires_at, revoked_at) = row;
    RefreshToken {
        id,
        token_hash,
        client_id,
        user_id,
        scope,
        created_at,
        expires_at,
        revoked_at,
    }
}

/// Refresh token records in the `refresh_tokens` table.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStorage {
    /// Creates a refresh token storage over the pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStorage for PostgresRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO refresh_tokens
                (id, token_hash, client_id, user_id, scope, created_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(&token.client_id)
        .bind(&token.user_id)
        .bind(&token.scope)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, "refresh token"))?;

        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let row: Option<RefreshTokenTuple> = query_as(
            r#"
            SELECT id, token_hash, client_id, user_id, scope, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(row_to_token))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        let result = query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&*self.pool)
            .await
            .map_err(StorageError::from)?;

        debug!(removed = result.rows_affected(), "Deleted expired refresh tokens");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_row_to_token() {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        let token = row_to_token((
            id,
            "abc".to_string(),
            "demo".to_string(),
            "u-1".to_string(),
            "openid".to_string(),
            now,
            now + Duration::days(30),
            None,
        ));
        assert_eq!(token.id, id);
        assert!(token.is_valid());

        let revoked = row_to_token((
            id,
            "abc".to_string(),
            "demo".to_string(),
            "u-1".to_string(),
            "openid".to_string(),
            now,
            now + Duration::days(30),
            Some(now),
        ));
        assert!(revoked.is_revoked());
        assert!(!revoked.is_valid());
    }
}
