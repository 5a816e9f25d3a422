//! Engine configuration.
//!
//! All sections deserialize with defaults, so an empty `[auth]` table yields
//! a working development setup (HS256 with a placeholder secret, Google as
//! the upstream provider).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://id.example.com"
//!
//! [auth.oauth]
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "30d"
//! rotate_refresh_tokens = true
//!
//! [auth.signing]
//! algorithm = "HS256"
//! secret = "change-me"
//!
//! [auth.federation]
//! client_id = "1234.apps.googleusercontent.com"
//! client_secret = "..."
//! redirect_uri = "https://id.example.com/callback"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Secret used when none is configured. `validate_for_production` rejects it.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

/// Root configuration for the authorization engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim in issued tokens.
    pub issuer: String,

    /// Value of the `aud` claim in access and ID tokens.
    pub audience: String,

    /// Code, session and token lifetimes plus refresh behaviour.
    pub oauth: OAuthConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Upstream identity provider configuration.
    pub federation: FederationConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "idbridge".to_string(),
            audience: "idbridge".to_string(),
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            federation: FederationConfig::default(),
        }
    }
}

/// OAuth 2.0 lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// How long a pending authorization session may wait for the
    /// federation callback.
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,

    /// Interval of the background sweep over sessions, codes and
    /// expired durable records.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Revoke the presented refresh token when it is used.
    /// When disabled, a refresh token stays usable until it expires or is
    /// explicitly revoked.
    pub rotate_refresh_tokens: bool,

    /// Register unknown client ids on first sight as public clients.
    /// Development convenience only; it disables the client gate.
    pub allow_dynamic_clients: bool,

    /// Scope requested upstream when the client sends none.
    pub default_scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            session_lifetime: Duration::from_secs(900),            // 15 minutes
            sweep_interval: Duration::from_secs(60),
            access_token_lifetime: Duration::from_secs(3600),
            id_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            rotate_refresh_tokens: false,
            allow_dynamic_clients: false,
            default_scope: "openid email profile".to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm: "HS256" or "RS256".
    pub algorithm: String,

    /// Shared secret for HS256.
    pub secret: String,

    /// PEM private key for RS256 (PKCS#1 or PKCS#8).
    pub private_key_path: Option<String>,

    /// PEM public key for RS256. Derived from the private key when absent.
    pub public_key_path: Option<String>,

    /// Key id placed in the JWT header.
    pub key_id: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: DEFAULT_JWT_SECRET.to_string(),
            private_key_path: None,
            public_key_path: None,
            key_id: None,
        }
    }
}

/// Upstream identity provider configuration.
///
/// Endpoints default to Google's OAuth 2.0 endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Client id registered with the upstream provider.
    pub client_id: String,

    /// Client secret registered with the upstream provider.
    pub client_secret: String,

    /// Callback URL the upstream provider redirects back to.
    pub redirect_uri: String,

    /// Upstream authorization endpoint.
    pub auth_url: String,

    /// Upstream token endpoint.
    pub token_url: String,

    /// Upstream userinfo endpoint.
    pub userinfo_url: String,

    /// Timeout for calls to the upstream provider.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

/// Upper bound for every configured lifetime and interval.
pub const MAX_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The issuer or audience is empty
    /// - Any lifetime or the sweep interval is zero or longer than
    ///   [`MAX_LIFETIME`]
    /// - The signing algorithm is unsupported, or its key material is missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }
        if self.audience.is_empty() {
            return Err(ConfigError::InvalidValue(
                "audience cannot be empty".to_string(),
            ));
        }

        let lifetimes = [
            ("authorization_code_lifetime", self.oauth.authorization_code_lifetime),
            ("session_lifetime", self.oauth.session_lifetime),
            ("sweep_interval", self.oauth.sweep_interval),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            ("id_token_lifetime", self.oauth.id_token_lifetime),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
        ];
        for (name, value) in lifetimes {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
            if value > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must not exceed one year"
                )));
            }
        }

        match self.signing.algorithm.as_str() {
            "HS256" => {
                if self.signing.secret.is_empty() {
                    return Err(ConfigError::Missing("signing.secret".to_string()));
                }
            }
            "RS256" => {
                if self.signing.private_key_path.is_none() {
                    return Err(ConfigError::Missing(
                        "signing.private_key_path".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{}'. Must be HS256 or RS256",
                    other
                )));
            }
        }

        Ok(())
    }

    /// Validates the configuration for a deployment that talks to a real
    /// upstream provider.
    ///
    /// # Errors
    ///
    /// Everything [`validate`](Self::validate) rejects, plus missing
    /// federation credentials and the placeholder HS256 secret.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.federation.client_id.is_empty() {
            return Err(ConfigError::Missing("federation.client_id".to_string()));
        }
        if self.federation.client_secret.is_empty() {
            return Err(ConfigError::Missing(
                "federation.client_secret".to_string(),
            ));
        }
        if self.signing.algorithm == "HS256" && self.signing.secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InvalidValue(
                "signing.secret must be changed from the default".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.oauth.authorization_code_lifetime, Duration::from_secs(600));
        assert_eq!(config.oauth.session_lifetime, Duration::from_secs(900));
        assert_eq!(config.oauth.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(
            config.oauth.refresh_token_lifetime,
            Duration::from_secs(30 * 24 * 3600)
        );
        assert!(!config.oauth.rotate_refresh_tokens);
        assert!(!config.oauth.allow_dynamic_clients);
        assert_eq!(config.signing.algorithm, "HS256");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_humantime() {
        let json = r#"{
            "issuer": "https://id.example.com",
            "oauth": {
                "access_token_lifetime": "15m",
                "refresh_token_lifetime": "7days",
                "rotate_refresh_tokens": true
            }
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.issuer, "https://id.example.com");
        assert_eq!(config.audience, "idbridge");
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(900));
        assert_eq!(
            config.oauth.refresh_token_lifetime,
            Duration::from_secs(7 * 24 * 3600)
        );
        assert!(config.oauth.rotate_refresh_tokens);
        // untouched sections keep their defaults
        assert_eq!(config.oauth.authorization_code_lifetime, Duration::from_secs(600));
    }

    #[test]
    fn test_validate_rejects_zero_lifetime() {
        let mut config = AuthConfig::default();
        config.oauth.access_token_lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_token_lifetime"));
    }

    #[test]
    fn test_validate_rejects_oversized_lifetime() {
        let mut config = AuthConfig::default();
        config.oauth.refresh_token_lifetime = MAX_LIFETIME;
        assert!(config.validate().is_ok());

        config.oauth.refresh_token_lifetime = Duration::from_secs(u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_token_lifetime"));
    }

    #[test]
    fn test_validate_rejects_unknown_algorithm() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "ES512".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rs256_requires_key() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "RS256".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        config.signing.private_key_path = Some("/etc/idbridge/key.pem".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_for_production() {
        let mut config = AuthConfig::default();
        assert!(matches!(
            config.validate_for_production(),
            Err(ConfigError::Missing(_))
        ));

        config.federation.client_id = "client".to_string();
        config.federation.client_secret = "secret".to_string();
        let err = config.validate_for_production().unwrap_err();
        assert!(err.to_string().contains("signing.secret"));

        config.signing.secret = "a-real-secret".to_string();
        assert!(config.validate_for_production().is_ok());
    }
}
