//! Domain types shared by the engine and its storage backends.

pub mod client;
pub mod refresh_token;
pub mod user;

pub use client::{Client, ClientType, ClientValidationError, GrantType};
pub use refresh_token::RefreshToken;
pub use user::{ExternalIdentity, User};
