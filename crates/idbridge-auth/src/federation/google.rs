//! Google OAuth 2.0 federation client.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::FederationConfig;
use crate::federation::{FederationError, IdentityFederation, UpstreamTokens};
use crate::types::ExternalIdentity;

/// Scope requested upstream when the client asked for none.
pub const DEFAULT_UPSTREAM_SCOPE: &str = "openid email profile";

/// OAuth error body returned by the upstream token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Federation client for Google (or any provider with Google-shaped endpoints).
pub struct GoogleFederation {
    http_client: reqwest::Client,
    config: FederationConfig,
}

impl GoogleFederation {
    /// Creates a client from configuration. Every upstream call is bounded by
    /// `config.request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: FederationConfig) -> Result<Self, FederationError> {
        Url::parse(&config.auth_url)?;
        Url::parse(&config.token_url)?;
        Url::parse(&config.userinfo_url)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityFederation for GoogleFederation {
    fn auth_url(&self, state: &str, scope: &str) -> Result<String, FederationError> {
        let scope = if scope.trim().is_empty() {
            DEFAULT_UPSTREAM_SCOPE
        } else {
            scope
        };

        let mut url = Url::parse(&self.config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", scope)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<UpstreamTokens, FederationError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        tracing::debug!(token_url = %self.config.token_url, "Exchanging upstream authorization code");

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(FederationError::oauth_error(
                    oauth_error.error,
                    oauth_error.error_description.unwrap_or_default(),
                ));
            }

            return Err(FederationError::TokenExchangeFailed(format!(
                "HTTP {status} - {body}"
            )));
        }

        let tokens: UpstreamTokens = response.json().await.map_err(|e| {
            FederationError::TokenExchangeFailed(format!("Failed to parse token response: {e}"))
        })?;

        if tokens.access_token.is_empty() {
            return Err(FederationError::MissingField("access_token".to_string()));
        }

        Ok(tokens)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalIdentity, FederationError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FederationError::ProfileFetchFailed(format!(
                "HTTP {status} - {body}"
            )));
        }

        let identity: ExternalIdentity = response.json().await.map_err(|e| {
            FederationError::ProfileFetchFailed(format!("Failed to parse profile: {e}"))
        })?;

        if identity.subject.is_empty() {
            return Err(FederationError::MissingField("id".to_string()));
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> FederationConfig {
        FederationConfig {
            client_id: "upstream-client".to_string(),
            client_secret: "upstream-secret".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            auth_url: format!("{}/o/oauth2/v2/auth", server.uri()),
            token_url: format!("{}/token", server.uri()),
            userinfo_url: format!("{}/userinfo", server.uri()),
            request_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_auth_url_parameters() {
        let federation = GoogleFederation::new(FederationConfig {
            client_id: "gid".to_string(),
            ..FederationConfig::default()
        })
        .unwrap();

        let url = Url::parse(&federation.auth_url("session-1", "").unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "gid");
        assert_eq!(params["state"], "session-1");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], DEFAULT_UPSTREAM_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let result = GoogleFederation::new(FederationConfig {
            token_url: "not a url".to_string(),
            ..FederationConfig::default()
        });
        assert!(matches!(result, Err(FederationError::Url(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_and_fetch_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=upstream-code"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.abc",
                "expires_in": 3599,
                "token_type": "Bearer",
                "id_token": "eyJ..."
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1090001",
                "email": "ada@example.com",
                "verified_email": true,
                "name": "Ada Lovelace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let federation = GoogleFederation::new(config_for(&server)).unwrap();
        let tokens = federation.exchange_code("upstream-code").await.unwrap();
        assert_eq!(tokens.access_token, "ya29.abc");
        assert_eq!(tokens.expires_in, Some(3599));

        let identity = federation.fetch_profile(&tokens.access_token).await.unwrap();
        assert_eq!(identity.subject, "1090001");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn test_exchange_code_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let federation = GoogleFederation::new(config_for(&server)).unwrap();
        let err = federation.exchange_code("stale").await.unwrap_err();
        match err {
            FederationError::OAuthError { error, .. } => assert_eq!(error, "invalid_grant"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_profile_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let federation = GoogleFederation::new(config_for(&server)).unwrap();
        let err = federation.fetch_profile("expired").await.unwrap_err();
        assert!(matches!(err, FederationError::ProfileFetchFailed(_)));

        let auth_err: crate::error::AuthError = err.into();
        assert_eq!(auth_err.http_status(), 502);
    }
}
