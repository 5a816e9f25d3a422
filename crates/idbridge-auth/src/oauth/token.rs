//! Token endpoint request and response types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code for a token triple
//! - `refresh_token` - Exchange a refresh token for a fresh token triple

use serde::{Deserialize, Serialize};

use crate::token::TokenTriple;

/// Token request parameters.
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, client_id, code_verifier (when
///   the authorization request carried a challenge)
/// - `refresh_token`: refresh_token, client_id
///
/// Clients authenticate with HTTP Basic Auth (not in this struct) or with
/// `client_id` + `client_secret` in the body. Public clients send only
/// `client_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    #[serde(default)]
    pub grant_type: String,

    /// Authorization code (authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI the code was delivered to.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier.
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful token response.
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "eyJhbG...",
///   "id_token": "eyJhbG...",
///   "scope": "openid email"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Refresh token (JWT).
    pub refresh_token: String,

    /// OpenID Connect ID token (JWT).
    pub id_token: String,

    /// Granted scope (space-separated). Omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

impl From<TokenTriple> for TokenResponse {
    fn from(triple: TokenTriple) -> Self {
        Self {
            access_token: triple.access_token,
            token_type: "Bearer".to_string(),
            expires_in: triple.expires_in,
            refresh_token: triple.refresh_token,
            id_token: triple.id_token,
            scope: triple.scope,
        }
    }
}
