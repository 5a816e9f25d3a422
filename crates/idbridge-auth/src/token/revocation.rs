//! Token revocation (RFC 7009)
//!
//! # Security Considerations
//!
//! - The revocation endpoint answers 200 OK for unknown and invalid tokens
//!   (don't reveal token existence)
//! - Revoked tokens are recorded by SHA-256 fingerprint, never in the clear
//! - Ledger entries expire with the token they revoke
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Returns the SHA-256 hex fingerprint of a raw token string.
///
/// Used as the key of both the revocation ledger and the durable refresh
/// token records.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request per RFC 7009.
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke.
    #[serde(default)]
    pub token: String,

    /// Optional hint about the token type. Only changes the order in which
    /// the token kinds are tried.
    #[serde(default, deserialize_with = "TokenTypeHint::deserialize_lenient")]
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Token type hint for revocation and introspection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a hint. Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Deserializes an optional hint, ignoring values it does not know
    /// (RFC 7009 section 2.1).
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().and_then(Self::parse))
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
