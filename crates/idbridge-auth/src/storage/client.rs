//! Client directory trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage trait for OAuth client registrations.
///
/// The engine only reads registrations, except when dynamic client
/// registration is enabled for development, where unknown clients are
/// created on first use.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Finds a client by its client id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Stores a new client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same id exists or the storage
    /// operation fails.
    async fn create(&self, client: &Client) -> AuthResult<Client>;
}
