//! Token introspection endpoint (RFC 7662).
//!
//! Always answers 200. A missing, malformed, expired, revoked or foreign
//! token is simply `{"active": false}`.

use axum::{Json, extract::State, response::{IntoResponse, Response}};

use crate::error::AuthError;
use crate::http::AppState;
use crate::http::extract::FormOrJson;
use crate::http::token::no_store;
use crate::token::{IntrospectionRequest, IntrospectionResponse};

/// `POST /introspect`.
pub async fn introspect_handler(
    State(state): State<AppState>,
    body: Result<FormOrJson<IntrospectionRequest>, AuthError>,
) -> Response {
    let response = match body {
        Ok(FormOrJson(request)) if !request.token.is_empty() => {
            state.tokens.introspect(&request.token).await
        }
        _ => IntrospectionResponse::inactive(),
    };

    no_store(Json(response).into_response())
}
