//! Axum handlers for the OAuth endpoints.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /authorize` | [`authorize_handler`] |
//! | `GET /callback` | [`callback_handler`] |
//! | `POST /token` | [`token_handler`] |
//! | `POST /introspect` | [`introspect_handler`] |
//! | `POST /revoke` | [`revoke_handler`] |
//! | `GET, POST /userinfo` | [`userinfo_handler`] |
//! | `GET /health` | [`health_handler`] |

pub mod authorize;
pub mod error;
pub mod extract;
pub mod introspect;
pub mod revoke;
pub mod token;
pub mod userinfo;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};

use crate::oauth::AuthorizationService;
use crate::storage::UserStorage;
use crate::token::TokenService;

pub use authorize::{CallbackQuery, authorize_handler, callback_handler};
pub use error::ErrorBody;
pub use extract::FormOrJson;
pub use introspect::introspect_handler;
pub use revoke::revoke_handler;
pub use token::token_handler;
pub use userinfo::{UserInfoResponse, userinfo_handler};

/// Shared state of the OAuth handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authorization-code flow.
    pub authorization: Arc<AuthorizationService>,
    /// Token lifecycle coordinator.
    pub tokens: Arc<TokenService>,
    /// User directory, read by UserInfo.
    pub users: Arc<dyn UserStorage>,
}

impl AppState {
    /// Creates handler state around an authorization service.
    pub fn new(authorization: Arc<AuthorizationService>, users: Arc<dyn UserStorage>) -> Self {
        let tokens = authorization.token_service().clone();
        Self {
            authorization,
            tokens,
            users,
        }
    }
}

/// Builds the OAuth router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/authorize", get(authorize_handler))
        .route("/callback", get(callback_handler))
        .route("/token", post(token_handler))
        .route("/introspect", post(introspect_handler))
        .route("/revoke", post(revoke_handler))
        .route("/userinfo", get(userinfo_handler).post(userinfo_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health`.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::{FederationError, IdentityFederation, UpstreamTokens};
    use crate::oauth::{ClientValidator, SessionCodeStore, pkce};
    use crate::storage::{
        MemoryClientStorage, MemoryRefreshTokenStorage, MemoryRevokedTokenStorage,
        MemoryUserStorage,
    };
    use crate::token::{JwtService, SigningKey, TokenConfig};
    use crate::types::{Client, ExternalIdentity};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::task::JoinHandle;

    struct StubFederation;

    #[async_trait]
    impl IdentityFederation for StubFederation {
        fn auth_url(&self, state: &str, _scope: &str) -> Result<String, FederationError> {
            let mut url = url::Url::parse("https://upstream.test/auth")?;
            url.query_pairs_mut().append_pair("state", state);
            Ok(url.to_string())
        }

        async fn exchange_code(&self, _code: &str) -> Result<UpstreamTokens, FederationError> {
            Ok(UpstreamTokens {
                access_token: "upstream-access".to_string(),
                refresh_token: None,
                expires_in: None,
                token_type: None,
                id_token: None,
            })
        }

        async fn fetch_profile(
            &self,
            _access_token: &str,
        ) -> Result<ExternalIdentity, FederationError> {
            Ok(ExternalIdentity {
                subject: "u1".to_string(),
                email: "u1@example.com".to_string(),
                email_verified: true,
                name: "User One".to_string(),
                ..Default::default()
            })
        }
    }

    fn app() -> Router {
        let clients = Arc::new(MemoryClientStorage::with_clients([Client::public(
            "demo",
            vec!["http://x/cb".to_string()],
        )]));
        let users = Arc::new(MemoryUserStorage::new());
        let jwt = Arc::new(JwtService::new(SigningKey::hmac(b"http-test"), "idbridge", "idbridge"));
        let tokens = Arc::new(TokenService::new(
            jwt,
            users.clone(),
            Arc::new(MemoryRefreshTokenStorage::new()),
            Arc::new(MemoryRevokedTokenStorage::new()),
            TokenConfig::default(),
        ));
        let authorization = Arc::new(AuthorizationService::new(
            ClientValidator::new(clients),
            Arc::new(SessionCodeStore::default()),
            tokens,
            users.clone(),
            Arc::new(StubFederation),
        ));

        router(AppState::new(authorization, users))
    }

    async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app())
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });

        (format!("http://{addr}"), tx, server)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    fn location_query(resp: &reqwest::Response) -> HashMap<String, String> {
        let location = resp.headers()["location"].to_str().unwrap();
        url::Url::parse(location)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let (base, shutdown, handle) = start_server().await;
        let http = client();
        let verifier = pkce::generate_verifier();
        let challenge = pkce::s256_challenge(&verifier);

        let resp = http
            .get(format!("{base}/authorize"))
            .query(&[
                ("response_type", "code"),
                ("client_id", "demo"),
                ("redirect_uri", "http://x/cb"),
                ("state", "abc"),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 302);
        let session_id = location_query(&resp)["state"].clone();

        let resp = http
            .get(format!("{base}/callback"))
            .query(&[("code", "upstream"), ("state", session_id.as_str())])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 302);
        let params = location_query(&resp);
        assert_eq!(params["state"], "abc");
        let code = params["code"].clone();

        let resp = http
            .post(format!("{base}/token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", "http://x/cb"),
                ("client_id", "demo"),
                ("code_verifier", verifier.as_str()),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        let tokens: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(tokens["token_type"], "Bearer");
        let access = tokens["access_token"].as_str().unwrap().to_string();

        let resp = http
            .get(format!("{base}/userinfo"))
            .bearer_auth(&access)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let info: UserInfoResponse = resp.json().await.unwrap();
        assert_eq!(info.email, "u1@example.com");

        let resp = http
            .post(format!("{base}/revoke"))
            .json(&serde_json::json!({ "token": access }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let introspection: serde_json::Value = http
            .post(format!("{base}/introspect"))
            .form(&[("token", access.as_str())])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(introspection, serde_json::json!({ "active": false }));

        let resp = http
            .post(format!("{base}/userinfo"))
            .bearer_auth(&access)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        let _ = shutdown.send(());
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_error_responses() {
        let (base, shutdown, handle) = start_server().await;
        let http = client();

        let resp = http.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(resp.status(), 200);

        let resp = http
            .post(format!("{base}/token"))
            .form(&[("grant_type", "password"), ("client_id", "demo")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "unsupported_grant_type");

        let resp = http
            .post(format!("{base}/token"))
            .form(&[("grant_type", "authorization_code"), ("client_id", "demo")])
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_request");

        let resp = http
            .post(format!("{base}/introspect"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["active"], false);

        let resp = http
            .post(format!("{base}/revoke"))
            .form(&[("token", "")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = http
            .post(format!("{base}/revoke"))
            .form(&[("token", "garbage"), ("token_type_hint", "refresh_token")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = http.get(format!("{base}/userinfo")).send().await.unwrap();
        assert_eq!(resp.status(), 401);
        assert!(resp.headers().contains_key("www-authenticate"));

        let resp = http
            .get(format!("{base}/authorize"))
            .query(&[("response_type", "code"), ("client_id", "demo"), ("redirect_uri", "http://evil/cb")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = http
            .get(format!("{base}/callback"))
            .query(&[("code", "c"), ("state", "unknown")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let _ = shutdown.send(());
        let _ = handle.await;
    }
}
