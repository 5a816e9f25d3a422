//! Storage traits for durable auth data, plus in-memory implementations.
//!
//! - [`ClientStorage`] - client directory
//! - [`UserStorage`] - local users created from federated identities
//! - [`RefreshTokenStorage`] - durable refresh token records
//! - [`RevokedTokenStorage`] - revocation ledger
//!
//! Authorization sessions and codes are deliberately absent: they live only
//! in the in-process [`SessionCodeStore`](crate::oauth::store::SessionCodeStore).

pub mod client;
pub mod memory;
pub mod refresh_token;
pub mod revoked_token;
pub mod user;

pub use client::ClientStorage;
pub use memory::{
    MemoryClientStorage, MemoryRefreshTokenStorage, MemoryRevokedTokenStorage, MemoryUserStorage,
};
pub use refresh_token::RefreshTokenStorage;
pub use revoked_token::RevokedTokenStorage;
pub use user::UserStorage;
