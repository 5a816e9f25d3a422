//! RFC 6749 error rendering.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AuthError;

/// OAuth 2.0 error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// OAuth error code.
    pub error: &'static str,
    /// Human-readable description.
    pub error_description: String,
}

impl AuthError {
    /// Description that is safe to show a caller. Server-side failures get a
    /// generic text, and failed code bindings read like an unknown code;
    /// details only go to the log.
    #[must_use]
    pub fn public_description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::UnauthorizedClient { message }
            | Self::InvalidToken { message } => message.clone(),
            Self::UnsupportedGrantType { grant_type } => {
                format!("Grant type '{grant_type}' is not supported")
            }
            Self::UnsupportedResponseType { response_type } => {
                format!("Response type '{response_type}' is not supported")
            }
            Self::PkceVerificationFailed => "Invalid or expired authorization code".to_string(),
            Self::TokenExpired => "The access token expired".to_string(),
            Self::TokenRevoked => "The access token has been revoked".to_string(),
            Self::UnknownSession => "Unknown or expired authorization session".to_string(),
            Self::Storage { .. } => "Service temporarily unavailable".to_string(),
            Self::Federation { .. } => "Upstream identity provider error".to_string(),
            Self::Configuration { .. } | Self::Internal { .. } => {
                "The server encountered an unexpected error".to_string()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Request rejected");
        }

        let body = ErrorBody {
            error: self.oauth_error_code(),
            error_description: self.public_description(),
        };

        let mut response = (status, Json(&body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = match self {
                Self::InvalidClient { .. } => "Basic realm=\"idbridge\"".to_string(),
                _ => format!(
                    "Bearer error=\"{}\", error_description=\"{}\"",
                    body.error,
                    body.error_description.replace('"', "'")
                ),
            };
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}
