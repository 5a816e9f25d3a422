//! Revocation ledger trait.
//!
//! The ledger holds fingerprints of explicitly revoked tokens. Each entry
//! carries the natural expiry of the token it revokes; past that moment the
//! token is dead anyway and the entry may be purged, which keeps the ledger
//! bounded.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;

/// Storage trait for revoked token fingerprints.
///
/// Fingerprints are SHA-256 hex digests of the raw token string (see
/// [`token_fingerprint`](crate::token::revocation::token_fingerprint)), so
/// revoked material is never stored in the clear.
#[async_trait]
pub trait RevokedTokenStorage: Send + Sync {
    /// Adds a fingerprint to the ledger.
    ///
    /// Idempotent: adding a fingerprint twice succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, fingerprint: &str, expires_at: OffsetDateTime) -> AuthResult<()>;

    /// Checks whether a fingerprint is in the ledger.
    ///
    /// Must return `false` once the entry's `expires_at` has passed, whether
    /// or not the entry has been purged yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_revoked(&self, fingerprint: &str) -> AuthResult<bool>;

    /// Removes entries whose `expires_at` has passed and returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
