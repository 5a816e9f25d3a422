//! Upstream identity federation.
//!
//! Authentication of the end user is delegated to an external OAuth 2.0
//! provider. This module defines the seam the authorization flow talks to
//! ([`IdentityFederation`]), a Google implementation of it, and the
//! provisioning step that turns the asserted identity into a local user.
//!
//! # Flow
//!
//! 1. `/authorize` redirects the browser to [`IdentityFederation::auth_url`],
//!    passing the pending session id as `state`.
//! 2. The provider redirects back to `/callback` with its own code.
//! 3. [`IdentityFederation::exchange_code`] trades that code for upstream
//!    tokens, and [`IdentityFederation::fetch_profile`] reads the profile.
//! 4. [`provisioning::find_or_create_user`] links the profile to a local user
//!    when the client redeems its own code.

pub mod error;
pub mod google;
pub mod provisioning;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::ExternalIdentity;

pub use error::FederationError;
pub use google::GoogleFederation;
pub use provisioning::find_or_create_user;

/// Tokens returned by the upstream token endpoint.
///
/// Only the access token is used; the rest is kept for logging and future use.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTokens {
    /// Upstream access token, used to read the profile.
    pub access_token: String,

    /// Upstream refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Upstream access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Token type, normally "Bearer".
    #[serde(default)]
    pub token_type: Option<String>,

    /// Upstream ID token.
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Stateless client of an upstream identity provider.
#[async_trait]
pub trait IdentityFederation: Send + Sync {
    /// Builds the URL the browser is sent to for upstream login.
    ///
    /// An empty `scope` means the provider default.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Url` if the configured endpoint is invalid.
    fn auth_url(&self, state: &str, scope: &str) -> Result<String, FederationError>;

    /// Exchanges an upstream authorization code for upstream tokens.
    async fn exchange_code(&self, code: &str) -> Result<UpstreamTokens, FederationError>;

    /// Reads the user's profile with an upstream access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalIdentity, FederationError>;
}
