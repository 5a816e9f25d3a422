//! Token endpoint.
//!
//! ```text
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code&code=...&redirect_uri=http://x/cb
//! &client_id=demo&code_verifier=...
//! ```
//!
//! JSON bodies are accepted as well. Confidential clients authenticate with
//! HTTP Basic or `client_secret` in the body. Every response, success or
//! error, is marked `Cache-Control: no-store`.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::AuthResult;
use crate::error::AuthError;
use crate::http::AppState;
use crate::http::extract::{FormOrJson, authorization_header};
use crate::oauth::{ClientCredentials, CodeRedemption, TokenRequest, TokenResponse};
use crate::token::TokenTriple;
use crate::types::GrantType;

/// `POST /token`.
pub async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<FormOrJson<TokenRequest>, AuthError>,
) -> Response {
    let result = match body {
        Ok(FormOrJson(request)) => process(&state, &headers, request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(triple) => no_store((StatusCode::OK, Json(TokenResponse::from(triple))).into_response()),
        Err(e) => {
            if e.is_security_violation() {
                warn!(error = %e, "Token request rejected");
            }
            no_store(e.into_response())
        }
    }
}

async fn process(
    state: &AppState,
    headers: &HeaderMap,
    request: TokenRequest,
) -> AuthResult<TokenTriple> {
    if request.grant_type.is_empty() {
        return Err(AuthError::invalid_request("grant_type is required"));
    }
    let grant = GrantType::parse(&request.grant_type)
        .ok_or_else(|| AuthError::unsupported_grant_type(&request.grant_type))?;

    let credentials = ClientCredentials::from_request(
        authorization_header(headers),
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )
    .ok_or_else(|| AuthError::invalid_request("client_id is required"))?;

    debug!(grant_type = %grant, client_id = %credentials.client_id, "Processing token request");

    match grant {
        GrantType::AuthorizationCode => {
            let (Some(code), Some(redirect_uri)) = (
                request.code.filter(|c| !c.is_empty()),
                request.redirect_uri.filter(|r| !r.is_empty()),
            ) else {
                return Err(AuthError::invalid_request(
                    "code and redirect_uri are required",
                ));
            };

            state
                .authorization
                .redeem_code(&CodeRedemption {
                    code,
                    client_id: credentials.client_id,
                    client_secret: credentials.client_secret,
                    redirect_uri,
                    code_verifier: request.code_verifier,
                })
                .await
        }
        GrantType::RefreshToken => {
            let refresh_token = request
                .refresh_token
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AuthError::invalid_request("refresh_token is required"))?;

            state
                .authorization
                .refresh_tokens(
                    &refresh_token,
                    &credentials.client_id,
                    credentials.client_secret.as_deref(),
                )
                .await
        }
    }
}

pub(crate) fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-store"),
    );
    headers.insert(
        axum::http::header::PRAGMA,
        axum::http::HeaderValue::from_static("no-cache"),
    );
    response
}
