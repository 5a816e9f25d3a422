//! OpenID Connect UserInfo endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::http::AppState;
use crate::http::extract::bearer_token;
use crate::types::User;

/// UserInfo response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Local user id.
    pub sub: String,
    /// Email address.
    pub email: String,
    /// Whether the email is verified.
    pub email_verified: bool,
    /// Display name.
    pub name: String,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Profile picture URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl From<User> for UserInfoResponse {
    fn from(user: User) -> Self {
        Self {
            sub: user.id,
            email: user.email,
            email_verified: user.email_verified,
            name: user.name,
            given_name: user.given_name,
            family_name: user.family_name,
            picture: user.picture,
        }
    }
}

/// `GET|POST /userinfo`.
pub async fn userinfo_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<Json<UserInfoResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AuthError::invalid_token("Missing bearer token"))?;

    let claims = state.tokens.authenticate_access(token).await?;

    let user = state
        .users
        .find_by_id(claims.subject())
        .await?
        .ok_or_else(|| AuthError::invalid_token("User not found"))?;

    Ok(Json(user.into()))
}
