//! Request extractors.

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    http::HeaderMap,
};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// Body that may be sent as `application/x-www-form-urlencoded` or as JSON,
/// chosen by `Content-Type`.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AuthError::invalid_request(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AuthError::invalid_request(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Returns the raw `Authorization` header value, if it is valid text.
#[must_use]
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Extracts a bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    authorization_header(headers)?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
