//! Token revocation endpoint (RFC 7009).
//!
//! Answers 200 for every token, recognized or not, so callers cannot probe
//! which tokens exist. Only a request without a token is rejected.

use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::AuthResult;
use crate::error::AuthError;
use crate::http::AppState;
use crate::http::extract::FormOrJson;
use crate::token::RevocationRequest;

/// `POST /revoke`.
pub async fn revoke_handler(
    State(state): State<AppState>,
    FormOrJson(request): FormOrJson<RevocationRequest>,
) -> AuthResult<StatusCode> {
    if request.token.is_empty() {
        return Err(AuthError::invalid_request("Missing required 'token' parameter"));
    }

    if let Err(e) = state
        .tokens
        .revoke(&request.token, request.token_type_hint)
        .await
    {
        warn!(error = %e, "Revocation could not be recorded");
    }

    Ok(StatusCode::OK)
}
