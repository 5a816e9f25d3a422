//! Authorization and upstream callback endpoints.
//!
//! ```text
//! GET /authorize?response_type=code&client_id=demo&redirect_uri=http://x/cb
//!     &state=xyz&code_challenge=...&code_challenge_method=S256
//!   -> 302 to the upstream login page, state=<session id>
//!
//! GET /callback?code=<upstream code>&state=<session id>
//!   -> 302 to http://x/cb?code=<code>&state=xyz
//! ```

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AuthResult;
use crate::error::AuthError;
use crate::http::AppState;
use crate::oauth::AuthorizationRequest;

/// Query parameters of the upstream callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    /// Upstream authorization code.
    #[serde(default)]
    pub code: Option<String>,
    /// Session id, sent upstream as `state`.
    #[serde(default)]
    pub state: Option<String>,
    /// Upstream error, e.g. `access_denied`.
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /authorize`.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Query(request): Query<AuthorizationRequest>,
) -> AuthResult<Response> {
    let start = state.authorization.begin_authorization(&request).await?;
    Ok(found(&start.federation_url))
}

/// `GET /callback`.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> AuthResult<Response> {
    let session_id = query.state.as_deref().unwrap_or_default();

    if let Some(error) = query.error.as_deref().filter(|e| !e.is_empty()) {
        let redirect = state.authorization.abort_federation(session_id, error)?;
        return Ok(found(&redirect));
    }

    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::invalid_request("Missing authorization code"))?;

    let completion = state
        .authorization
        .handle_callback(session_id, code)
        .await?;

    Ok(found(&completion.redirect_url))
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
