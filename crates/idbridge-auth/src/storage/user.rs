//! User directory trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::User;

/// Storage trait for local users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>>;

    /// Finds a user by the subject identifier of the upstream provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_external_id(&self, external_id: &str) -> AuthResult<Option<User>>;

    /// Finds a user by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email is taken or the storage
    /// operation fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Replaces the profile of an existing user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the storage
    /// operation fails.
    async fn update(&self, user: &User) -> AuthResult<()>;
}
