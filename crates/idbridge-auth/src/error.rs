//! Error types for the authorization engine.
//!
//! Every failure that crosses the engine boundary is an [`AuthError`].
//! Component-local errors (PKCE, JWT, client validation, federation) are
//! translated into one of these variants before they reach a caller, so
//! storage and upstream details never leak into OAuth responses.

use std::fmt;

/// Errors that can occur during authorization and token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client authentication failed or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, revoked,
    /// or was issued to another client.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The client is registered but may not use the requested grant.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of the restriction.
        message: String,
    },

    /// A bearer token could not be validated.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token endpoint does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The authorization endpoint does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The PKCE code verifier does not match the stored challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token has been revoked.
    #[error("Token revoked")]
    TokenRevoked,

    /// No pending authorization session exists for the given state.
    #[error("Unknown or expired authorization session")]
    UnknownSession,

    /// Durable storage failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The upstream identity provider failed or returned an error.
    #[error("Federation error: {message}")]
    Federation {
        /// Description of the federation error.
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Federation` error.
    #[must_use]
    pub fn federation(message: impl Into<String>) -> Self {
        Self::Federation {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Client | ErrorCategory::SecurityViolation
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::TransientInfrastructure | ErrorCategory::Internal
        )
    }

    /// Returns `true` if the failure came from a failed security check.
    #[must_use]
    pub fn is_security_violation(&self) -> bool {
        self.category() == ErrorCategory::SecurityViolation
    }

    /// Returns the error category for logging and monitoring.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::UnsupportedGrantType { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::UnauthorizedClient { .. }
            | Self::UnknownSession
            | Self::TokenExpired => ErrorCategory::Client,
            Self::InvalidClient { .. }
            | Self::InvalidGrant { .. }
            | Self::InvalidToken { .. }
            | Self::PkceVerificationFailed
            | Self::TokenRevoked => ErrorCategory::SecurityViolation,
            Self::Storage { .. } | Self::Federation { .. } => {
                ErrorCategory::TransientInfrastructure
            }
            Self::Configuration { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } | Self::UnknownSession => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::InvalidGrant { .. } | Self::PkceVerificationFailed => "invalid_grant",
            Self::InvalidToken { .. } | Self::TokenExpired | Self::TokenRevoked => "invalid_token",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::Storage { .. } => "temporarily_unavailable",
            Self::Federation { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }

    /// Returns the HTTP status this error renders with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient { .. }
            | Self::InvalidToken { .. }
            | Self::TokenExpired
            | Self::TokenRevoked => 401,
            Self::Storage { .. } => 503,
            Self::Federation { .. } => 502,
            Self::Configuration { .. } | Self::Internal { .. } => 500,
            _ => 400,
        }
    }
}

/// Error categories used for logging and for deciding what a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unsupported request.
    Client,
    /// Storage or upstream identity provider unavailable. The caller may retry.
    TransientInfrastructure,
    /// A signature, PKCE, client or redirect check failed.
    SecurityViolation,
    /// Misconfiguration or a bug.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::TransientInfrastructure => write!(f, "transient_infrastructure"),
            Self::SecurityViolation => write!(f, "security_violation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_and_messages() {
        let err = AuthError::invalid_grant("code already used");
        assert_eq!(err.to_string(), "Invalid grant: code already used");

        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(err.to_string(), "Unsupported grant type: password");

        assert_eq!(
            AuthError::UnknownSession.to_string(),
            "Unknown or expired authorization session"
        );
    }

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(AuthError::TokenRevoked.oauth_error_code(), "invalid_token");
        assert_eq!(AuthError::storage("db").oauth_error_code(), "temporarily_unavailable");
        assert_eq!(AuthError::federation("down").oauth_error_code(), "server_error");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            AuthError::invalid_request("x").category(),
            ErrorCategory::Client
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.category(),
            ErrorCategory::SecurityViolation
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::TransientInfrastructure
        );
        assert_eq!(
            AuthError::internal("x").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_client_and_server_predicates() {
        assert!(AuthError::invalid_grant("x").is_client_error());
        assert!(AuthError::invalid_grant("x").is_security_violation());
        assert!(!AuthError::invalid_grant("x").is_server_error());

        assert!(AuthError::federation("x").is_server_error());
        assert!(!AuthError::federation("x").is_client_error());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_client("x").http_status(), 401);
        assert_eq!(AuthError::invalid_grant("x").http_status(), 400);
        assert_eq!(AuthError::storage("x").http_status(), 503);
        assert_eq!(AuthError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(
            ErrorCategory::SecurityViolation.to_string(),
            "security_violation"
        );
        assert_eq!(
            ErrorCategory::TransientInfrastructure.to_string(),
            "transient_infrastructure"
        );
    }
}
