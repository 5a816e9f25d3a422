//! Durable refresh token record.
//!
//! The refresh token handed to the client is a signed JWT. Only its SHA-256
//! fingerprint is persisted, together with the subject, client, scope and
//! lifecycle timestamps needed to refresh, rotate and revoke it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::token::revocation::token_fingerprint;

/// Refresh token record stored in durable storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// SHA-256 hex fingerprint of the issued token.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Local user id (the token subject).
    pub user_id: String,

    /// Granted scope (space-separated).
    pub scope: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Builds a new, unrevoked record for an issued token.
    #[must_use]
    pub fn new(
        token: &str,
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        scope: impl Into<String>,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_hash: token_fingerprint(token),
            client_id: client_id.into(),
            user_id: user_id.into(),
            scope: scope.into(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at: None,
        }
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}
