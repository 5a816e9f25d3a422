//! In-memory storage backends.
//!
//! Used for development, single-instance deployments and tests. Everything is
//! lost on restart, including revocations.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use super::{ClientStorage, RefreshTokenStorage, RevokedTokenStorage, UserStorage};
use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{Client, RefreshToken, User};

// =============================================================================
// Clients
// =============================================================================

/// Client directory backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl MemoryClientStorage {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with the given clients.
    #[must_use]
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let storage = Self::new();
        for client in clients {
            storage.clients.insert(client.client_id.clone(), client);
        }
        storage
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn create(&self, client: &Client) -> AuthResult<Client> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "client '{}' already exists",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(client.clone())
            }
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// User directory backed by a concurrent map keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryUserStorage {
    users: DashMap<String, User>,
}

impl MemoryUserStorage {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no users are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn find_by(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn find_by_external_id(&self, external_id: &str) -> AuthResult<Option<User>> {
        Ok(self.find_by(|u| u.external_id.as_deref() == Some(external_id)))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.find_by(|u| u.email == email))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        if !user.email.is_empty() && self.find_by(|u| u.email == user.email).is_some() {
            return Err(AuthError::storage(format!(
                "user with email '{}' already exists",
                user.email
            )));
        }
        if let Some(external_id) = user.external_id.as_deref()
            && self
                .find_by(|u| u.external_id.as_deref() == Some(external_id))
                .is_some()
        {
            return Err(AuthError::storage(format!(
                "user with external id '{external_id}' already exists"
            )));
        }
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "user '{}' already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AuthError::storage(format!("user '{}' not found", user.id))),
        }
    }
}

// =============================================================================
// Refresh tokens
// =============================================================================

/// Refresh token records keyed by token fingerprint.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: DashMap<String, RefreshToken>,
}

impl MemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including revoked and expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn live_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_valid()).count()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        match self.tokens.entry(token.token_hash.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage("duplicate refresh token hash")),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token_hash).map(|t| t.value().clone()))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        // get_mut holds the shard lock across the check and the write
        if let Some(mut record) = self.tokens.get_mut(token_hash)
            && record.revoked_at.is_none()
        {
            record.revoked_at = Some(OffsetDateTime::now_utc());
            return Ok(true);
        }
        Ok(false)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.tokens.len();
        let now = OffsetDateTime::now_utc();
        self.tokens.retain(|_, token| token.expires_at > now);
        Ok((before - self.tokens.len()) as u64)
    }
}

// =============================================================================
// Revocation ledger
// =============================================================================

/// Revocation ledger mapping fingerprints to the revoked token's expiry.
#[derive(Debug, Default)]
pub struct MemoryRevokedTokenStorage {
    entries: DashMap<String, OffsetDateTime>,
}

impl MemoryRevokedTokenStorage {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevokedTokenStorage for MemoryRevokedTokenStorage {
    async fn revoke(&self, fingerprint: &str, expires_at: OffsetDateTime) -> AuthResult<()> {
        self.entries
            .entry(fingerprint.to_string())
            .and_modify(|existing| {
                if expires_at > *existing {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> AuthResult<bool> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .entries
            .get(fingerprint)
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.entries.len();
        let now = OffsetDateTime::now_utc();
        self.entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - self.entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExternalIdentity;
    use time::Duration;
    use tokio_test::block_on;

    fn user(id: &str, email: &str, external_id: &str) -> User {
        let identity = ExternalIdentity {
            subject: external_id.to_string(),
            email: email.to_string(),
            ..Default::default()
        };
        User::from_identity(id, &identity)
    }

    #[tokio::test]
    async fn test_client_create_and_find() {
        let storage = MemoryClientStorage::new();
        let client = Client::public("demo", vec!["http://x/cb".to_string()]);
        storage.create(&client).await.unwrap();

        let found = storage.find_by_client_id("demo").await.unwrap().unwrap();
        assert_eq!(found.client_id, "demo");
        assert!(storage.find_by_client_id("other").await.unwrap().is_none());

        assert!(storage.create(&client).await.is_err());
    }

    #[tokio::test]
    async fn test_user_lookups() {
        let storage = MemoryUserStorage::new();
        storage.create(&user("u1", "a@example.com", "g-1")).await.unwrap();

        assert_eq!(
            storage.find_by_external_id("g-1").await.unwrap().unwrap().id,
            "u1"
        );
        assert_eq!(
            storage.find_by_email("a@example.com").await.unwrap().unwrap().id,
            "u1"
        );
        assert!(storage.find_by_external_id("g-2").await.unwrap().is_none());

        // email and external id are unique
        assert!(storage.create(&user("u2", "a@example.com", "g-2")).await.is_err());
        assert!(storage.create(&user("u3", "b@example.com", "g-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_user_update() {
        let storage = MemoryUserStorage::new();
        let mut u = user("u1", "a@example.com", "g-1");
        storage.create(&u).await.unwrap();

        u.name = "Alice".to_string();
        storage.update(&u).await.unwrap();
        assert_eq!(storage.find_by_id("u1").await.unwrap().unwrap().name, "Alice");

        let missing = user("nope", "b@example.com", "g-9");
        assert!(storage.update(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_token_revoke_and_cleanup() {
        let storage = MemoryRefreshTokenStorage::new();
        let live = RefreshToken::new(
            "live-token",
            "demo",
            "u1",
            "openid",
            OffsetDateTime::now_utc() + Duration::days(1),
        );
        let expired = RefreshToken::new(
            "old-token",
            "demo",
            "u1",
            "openid",
            OffsetDateTime::now_utc() - Duration::seconds(1),
        );
        storage.create(&live).await.unwrap();
        storage.create(&expired).await.unwrap();
        assert!(storage.create(&live).await.is_err());

        assert!(storage.revoke(&live.token_hash).await.unwrap());
        let found = storage.find_by_hash(&live.token_hash).await.unwrap().unwrap();
        assert!(found.is_revoked());

        // revoking twice or revoking unknown hashes succeeds without effect
        assert!(!storage.revoke(&live.token_hash).await.unwrap());
        assert!(!storage.revoke("unknown").await.unwrap());

        assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_ledger_entries_lapse_at_expiry() {
        let ledger = MemoryRevokedTokenStorage::new();
        let now = OffsetDateTime::now_utc();

        block_on(ledger.revoke("live", now + Duration::hours(1))).unwrap();
        block_on(ledger.revoke("dead", now - Duration::seconds(1))).unwrap();

        assert!(block_on(ledger.is_revoked("live")).unwrap());
        assert!(!block_on(ledger.is_revoked("dead")).unwrap());
        assert!(!block_on(ledger.is_revoked("never")).unwrap());

        assert_eq!(block_on(ledger.cleanup_expired()).unwrap(), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ledger_revoke_is_idempotent() {
        let ledger = MemoryRevokedTokenStorage::new();
        let expiry = OffsetDateTime::now_utc() + Duration::hours(1);
        block_on(ledger.revoke("fp", expiry)).unwrap();
        block_on(ledger.revoke("fp", expiry)).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(block_on(ledger.is_revoked("fp")).unwrap());
    }
}
