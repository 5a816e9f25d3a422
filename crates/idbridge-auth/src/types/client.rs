//! OAuth 2.0 client registration types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types accepted at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with optional PKCE).
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Type
// =============================================================================

/// Whether a client can keep a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Holds a secret; must authenticate with it at the token endpoint.
    #[default]
    Confidential,
    /// Cannot hold a secret; PKCE binds the code instead.
    Public,
}

impl ClientType {
    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confidential => "confidential",
            Self::Public => "public",
        }
    }

    /// Parses the stored representation. Anything but "public" is confidential.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("public") {
            Self::Public
        } else {
            Self::Confidential
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Argon2 hash of the client secret (confidential clients).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Human-readable display name.
    pub name: String,

    /// Public or confidential.
    pub client_type: ClientType,

    /// Registered redirect URIs. Matching is exact.
    pub redirect_uris: Vec<String>,

    /// Grant types the client may use. Empty means all supported grants.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Space-separated scope registered for the client.
    #[serde(default)]
    pub scope: String,

    /// When the registration was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the registration was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Client {
    /// Creates a public client registration with the given redirect URIs.
    #[must_use]
    pub fn public(client_id: impl Into<String>, redirect_uris: Vec<String>) -> Self {
        let client_id = client_id.into();
        let now = OffsetDateTime::now_utc();
        Self {
            name: client_id.clone(),
            client_id,
            client_secret: None,
            client_type: ClientType::Public,
            redirect_uris,
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scope: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` for confidential clients.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_type == ClientType::Confidential
    }

    /// Checks if the given redirect URI is registered for this client.
    ///
    /// Only exact string matches count; no prefix or pattern matching.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the client may use the given grant type.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.is_empty() || self.grant_types.contains(&grant_type)
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is unusable.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.is_confidential() && self.client_secret.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        if self.is_grant_type_allowed(GrantType::AuthorizationCode)
            && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        Ok(())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidential_client() -> Client {
        let mut client = Client::public("web-app", vec!["https://app.example.com/cb".to_string()]);
        client.client_type = ClientType::Confidential;
        client.client_secret = Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string());
        client
    }

    #[test]
    fn test_public_client_defaults() {
        let client = Client::public("demo", vec!["http://x/cb".to_string()]);
        assert!(!client.is_confidential());
        assert!(client.is_grant_type_allowed(GrantType::AuthorizationCode));
        assert!(client.is_grant_type_allowed(GrantType::RefreshToken));
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = Client::public("demo", vec!["http://x/cb".to_string()]);
        assert!(client.is_redirect_uri_allowed("http://x/cb"));
        assert!(!client.is_redirect_uri_allowed("http://x/cb/"));
        assert!(!client.is_redirect_uri_allowed("http://x/cb?next=evil"));
        assert!(!client.is_redirect_uri_allowed("http://x/c"));
        assert!(!client.is_redirect_uri_allowed("HTTP://X/CB"));
    }

    #[test]
    fn test_grant_type_restriction() {
        let mut client = confidential_client();
        client.grant_types = vec![GrantType::AuthorizationCode];
        assert!(client.is_grant_type_allowed(GrantType::AuthorizationCode));
        assert!(!client.is_grant_type_allowed(GrantType::RefreshToken));

        client.grant_types.clear();
        assert!(client.is_grant_type_allowed(GrantType::RefreshToken));
    }

    #[test]
    fn test_validate() {
        assert!(confidential_client().validate().is_ok());

        let mut missing_secret = confidential_client();
        missing_secret.client_secret = None;
        assert!(matches!(
            missing_secret.validate(),
            Err(ClientValidationError::MissingSecret)
        ));

        let mut no_redirects = Client::public("demo", vec![]);
        assert!(matches!(
            no_redirects.validate(),
            Err(ClientValidationError::NoRedirectUris)
        ));
        no_redirects.grant_types = vec![GrantType::RefreshToken];
        assert!(no_redirects.validate().is_ok());

        let empty_id = Client::public("", vec!["http://x/cb".to_string()]);
        assert!(matches!(
            empty_id.validate(),
            Err(ClientValidationError::EmptyClientId)
        ));
    }

    #[test]
    fn test_type_and_grant_parsing() {
        assert_eq!(ClientType::parse("public"), ClientType::Public);
        assert_eq!(ClientType::parse("confidential"), ClientType::Confidential);
        assert_eq!(ClientType::parse(""), ClientType::Confidential);
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(GrantType::parse("password"), None);
        assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
    }

    #[test]
    fn test_serde_roundtrip_keeps_type() {
        let client = confidential_client();
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["clientType"], "confidential");
        assert_eq!(json["grantTypes"][0], "authorization_code");
        let back: Client = serde_json::from_value(json).unwrap();
        assert_eq!(back.client_type, ClientType::Confidential);
    }
}
