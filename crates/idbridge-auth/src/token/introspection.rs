//! Token introspection (RFC 7662)
//!
//! # Security Considerations
//!
//! - Never reveal why a token is inactive (expired vs revoked vs invalid)
//! - Always return a valid JSON response
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use serde::{Deserialize, Serialize};

use super::jwt::AccessClaims;
use super::revocation::TokenTypeHint;

/// Token introspection request per RFC 7662.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    #[serde(default)]
    pub token: String,

    /// Optional hint about the token type. Only access tokens can be active,
    /// so the hint is accepted and ignored.
    #[serde(default, deserialize_with = "TokenTypeHint::deserialize_lenient")]
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Token introspection response per RFC 7662.
///
/// If the token is invalid, expired, revoked, or unknown, the response
/// only contains `active: false`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active. The only required field.
    pub active: bool,

    /// Space-separated scopes granted to the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Human-readable identifier of the resource owner (the email).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Type of the token, always "Bearer" when active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject (local user id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl IntrospectionResponse {
    /// Creates an inactive response.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Creates an active response from verified access token claims.
    #[must_use]
    pub fn from_access_claims(claims: AccessClaims) -> Self {
        Self {
            active: true,
            scope: Some(claims.scope),
            client_id: Some(claims.client_id),
            username: Some(claims.email),
            token_type: Some("Bearer".to_string()),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            sub: Some(claims.sub),
            aud: Some(claims.aud),
            iss: Some(claims.iss),
            jti: Some(claims.jti),
        }
    }
}
