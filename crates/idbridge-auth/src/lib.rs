//! # idbridge-auth
//!
//! Authorization-code and token lifecycle engine with upstream identity
//! federation.
//!
//! This crate provides:
//! - The OAuth 2.0 authorization-code flow with optional PKCE
//! - Signed access, refresh and ID tokens (HS256 or RS256)
//! - Refresh, introspection and revocation
//! - Federation of end-user login to an upstream provider (Google)
//! - Axum handlers for the OAuth endpoints
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration
//! - [`oauth`] - Authorization-code flow, PKCE, client validation, session/code store
//! - [`token`] - Token signing, verification and lifecycle coordinator
//! - [`federation`] - Upstream identity provider client and user provisioning
//! - [`storage`] - Storage traits and in-memory implementations
//! - [`sweeper`] - Background expiry sweep
//! - [`http`] - Axum HTTP handlers for OAuth endpoints

pub mod config;
pub mod error;
pub mod federation;
pub mod http;
pub mod oauth;
pub mod random;
pub mod secret;
pub mod storage;
pub mod sweeper;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, FederationConfig, OAuthConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use federation::{
    FederationError, GoogleFederation, IdentityFederation, UpstreamTokens, find_or_create_user,
};
pub use http::{AppState, UserInfoResponse, router};
pub use oauth::{
    AuthorizationRequest, AuthorizationService, ClientValidator, CodeRedemption,
    SessionCodeStore,
};
pub use storage::{ClientStorage, RefreshTokenStorage, RevokedTokenStorage, UserStorage};
pub use sweeper::Sweeper;
pub use token::{JwtService, SigningKey, TokenConfig, TokenLifetimes, TokenService, TokenTriple};
pub use types::{Client, ClientType, ExternalIdentity, GrantType, RefreshToken, User};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use idbridge_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::federation::IdentityFederation;
    pub use crate::oauth::{AuthorizationService, ClientValidator, SessionCodeStore};
    pub use crate::storage::{
        ClientStorage, RefreshTokenStorage, RevokedTokenStorage, UserStorage,
    };
    pub use crate::token::{JwtService, TokenService};
    pub use crate::types::{Client, ExternalIdentity, GrantType, RefreshToken, User};
}
