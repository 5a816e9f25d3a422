//! Errors raised while talking to the upstream identity provider.

use crate::error::AuthError;

/// Errors that can occur during upstream federation calls.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// The upstream token endpoint rejected the code exchange.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The upstream profile endpoint failed.
    #[error("Profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    /// The upstream provider answered with an OAuth error.
    #[error("OAuth error from upstream: {error} - {description}")]
    OAuthError {
        /// The OAuth error code.
        error: String,
        /// Optional error description.
        description: String,
    },

    /// The provider's response is missing a required field.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A configured endpoint is not a valid URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl FederationError {
    /// Creates an `OAuthError` from an upstream error response.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuthError {
            error: error.into(),
            description: description.into(),
        }
    }
}

impl From<FederationError> for AuthError {
    fn from(err: FederationError) -> Self {
        match err {
            FederationError::Url(e) => AuthError::configuration(format!("Invalid federation URL: {e}")),
            other => AuthError::federation(other.to_string()),
        }
    }
}
