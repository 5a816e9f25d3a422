//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 fingerprints only
//! - Revocation must be immediate: a revoked record must never be reported
//!   as unrevoked afterwards
//! - Expired records are removed by the background sweep

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage trait for refresh token records.
///
/// # Implementations
///
/// - [`MemoryRefreshTokenStorage`](crate::storage::memory::MemoryRefreshTokenStorage)
/// - `idbridge-auth-postgres` - PostgreSQL storage backend
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored (duplicate hash,
    /// storage unavailable). Callers must not hand out the token in that case.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a record by token fingerprint.
    ///
    /// Returns records regardless of expiration or revocation status;
    /// callers check [`RefreshToken::is_valid`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Marks a record as revoked.
    ///
    /// Returns `true` only for the call that moved a live record to revoked;
    /// unknown and already revoked records yield `false`. The check and the
    /// update must be atomic, so that exactly one of several concurrent
    /// callers observes `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<bool>;

    /// Deletes expired records and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
