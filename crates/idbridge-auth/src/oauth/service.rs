//! OAuth authorization service.
//!
//! Drives the authorization-code flow end to end:
//!
//! 1. [`AuthorizationService::begin_authorization`] validates the client,
//!    redirect URI and PKCE challenge, records a pending session and returns
//!    the upstream login URL.
//! 2. [`AuthorizationService::handle_callback`] (or
//!    [`AuthorizationService::complete_federation`] when the identity is
//!    already known) consumes the session and mints a one-time code.
//! 3. [`AuthorizationService::redeem_code`] consumes the code, re-checks its
//!    binding and hands off to the [`TokenService`].
//!
//! # Usage
//!
//! ```ignore
//! use idbridge_auth::oauth::{AuthorizationRequest, AuthorizationService};
//!
//! let service = AuthorizationService::new(validator, store, tokens, users, federation);
//! let start = service.begin_authorization(&request).await?;
//! // redirect the browser to start.federation_url
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::AuthResult;
use crate::error::AuthError;
use crate::federation::{IdentityFederation, find_or_create_user};
use crate::oauth::client_auth::ClientValidator;
use crate::oauth::pkce;
use crate::oauth::store::{AuthSession, SessionCodeStore, TOKEN_LENGTH};
use crate::random::random_string;
use crate::storage::UserStorage;
use crate::token::{TokenService, TokenTriple};
use crate::types::{ExternalIdentity, GrantType};

/// Authorization request parameters, as received on `/authorize`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    #[serde(default)]
    pub response_type: String,

    /// Client identifier.
    #[serde(default)]
    pub client_id: String,

    /// Redirect URI. Must exactly match a registered one.
    #[serde(default)]
    pub redirect_uri: String,

    /// Client state, echoed back on the final redirect. Generated if absent.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method ("plain" or "S256").
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// Requested scope (space-separated).
    #[serde(default)]
    pub scope: Option<String>,
}

/// Result of a successful authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    /// Id of the pending session; doubles as the upstream `state`.
    pub session_id: String,
    /// Where to send the browser.
    pub federation_url: String,
}

/// Result of a completed upstream login.
#[derive(Debug, Clone)]
pub struct FederationCompletion {
    /// The one-time authorization code.
    pub code: String,
    /// Client redirect URI with `code` and `state` appended.
    pub redirect_url: String,
}

/// Parameters of an `authorization_code` token request.
#[derive(Debug, Clone, Default)]
pub struct CodeRedemption {
    /// The authorization code.
    pub code: String,
    /// Client presenting the code.
    pub client_id: String,
    /// Client secret, required for confidential clients.
    pub client_secret: Option<String>,
    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,
    /// PKCE verifier.
    pub code_verifier: Option<String>,
}

/// Authorization-code flow coordinator.
pub struct AuthorizationService {
    clients: ClientValidator,
    store: Arc<SessionCodeStore>,
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStorage>,
    federation: Arc<dyn IdentityFederation>,
    default_scope: String,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        clients: ClientValidator,
        store: Arc<SessionCodeStore>,
        tokens: Arc<TokenService>,
        users: Arc<dyn UserStorage>,
        federation: Arc<dyn IdentityFederation>,
    ) -> Self {
        Self {
            clients,
            store,
            tokens,
            users,
            federation,
            default_scope: String::new(),
        }
    }

    /// Sets the scope used when a request carries none.
    #[must_use]
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }

    /// The token coordinator.
    #[must_use]
    pub fn token_service(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// The session and code store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionCodeStore> {
        &self.store
    }

    /// Validates an authorization request and records a pending session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `response_type` is not "code" (`UnsupportedResponseType`)
    /// - `client_id` or `redirect_uri` is missing (`InvalidRequest`)
    /// - the client is unknown (`InvalidClient`)
    /// - the redirect URI is not registered (`InvalidRequest`)
    /// - the PKCE challenge or method is malformed (`InvalidRequest`)
    pub async fn begin_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> AuthResult<AuthorizationStart> {
        if request.response_type != "code" {
            return Err(AuthError::unsupported_response_type(&request.response_type));
        }

        if request.client_id.is_empty() || request.redirect_uri.is_empty() {
            return Err(AuthError::invalid_request(
                "client_id and redirect_uri are required",
            ));
        }

        self.clients
            .authorize_request(&request.client_id, &request.redirect_uri)
            .await?;

        let (code_challenge, code_challenge_method) = match non_empty(&request.code_challenge) {
            Some(challenge) => {
                let method = pkce::validate_challenge(
                    challenge,
                    request.code_challenge_method.as_deref(),
                )
                .map_err(|e| AuthError::invalid_request(format!("Invalid PKCE parameters: {e}")))?;
                (Some(challenge.to_string()), Some(method))
            }
            None => (None, None),
        };

        let state = non_empty(&request.state)
            .map(str::to_string)
            .unwrap_or_else(|| random_string(TOKEN_LENGTH));

        let scope = non_empty(&request.scope)
            .map(str::to_string)
            .unwrap_or_else(|| self.default_scope.clone());

        let session = AuthSession {
            id: random_string(TOKEN_LENGTH),
            client_id: request.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            state,
            code_challenge,
            code_challenge_method,
            scope,
            created_at: time::OffsetDateTime::now_utc(),
        };

        let federation_url = self.federation.auth_url(&session.id, &session.scope)?;
        let session_id = session.id.clone();
        self.store.put_session(session);

        debug!(client_id = %request.client_id, "Authorization session created");

        Ok(AuthorizationStart {
            session_id,
            federation_url,
        })
    }

    /// Handles the upstream callback: exchanges the upstream code, reads the
    /// profile and completes the flow.
    ///
    /// The session is checked before any upstream call, so an unknown
    /// `state` never reaches the provider.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession`, or `Federation` if the provider fails.
    pub async fn handle_callback(
        &self,
        session_id: &str,
        upstream_code: &str,
    ) -> AuthResult<FederationCompletion> {
        if self.store.get_session(session_id).is_none() {
            return Err(AuthError::UnknownSession);
        }

        let upstream = self.federation.exchange_code(upstream_code).await?;
        let identity = self.federation.fetch_profile(&upstream.access_token).await?;

        self.complete_federation(session_id, identity)
    }

    /// Consumes a pending session and mints a one-time code for the
    /// federated identity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if the session is missing, stale or already used.
    pub fn complete_federation(
        &self,
        session_id: &str,
        identity: ExternalIdentity,
    ) -> AuthResult<FederationCompletion> {
        let session = self
            .store
            .take_session(session_id)
            .ok_or(AuthError::UnknownSession)?;

        let mut redirect = url::Url::parse(&session.redirect_uri)
            .map_err(|_| AuthError::invalid_request("Registered redirect_uri is not a valid URL"))?;

        let code = self.store.issue_code(&session, identity);

        redirect
            .query_pairs_mut()
            .append_pair("code", &code.code)
            .append_pair("state", &session.state);

        info!(client_id = %session.client_id, "Authorization code issued");

        Ok(FederationCompletion {
            code: code.code,
            redirect_url: redirect.to_string(),
        })
    }

    /// Consumes a pending session after the upstream provider reported an
    /// error, and returns the client redirect URL carrying `error` and the
    /// client's `state`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if the session is missing, stale or already used.
    pub fn abort_federation(&self, session_id: &str, error: &str) -> AuthResult<String> {
        let session = self
            .store
            .take_session(session_id)
            .ok_or(AuthError::UnknownSession)?;

        let mut redirect = url::Url::parse(&session.redirect_uri)
            .map_err(|_| AuthError::invalid_request("Registered redirect_uri is not a valid URL"))?;
        redirect
            .query_pairs_mut()
            .append_pair("error", error)
            .append_pair("state", &session.state);

        warn!(client_id = %session.client_id, upstream_error = %error, "Upstream login failed");
        Ok(redirect.to_string())
    }

    /// Redeems an authorization code for a token triple.
    ///
    /// The code is consumed before its binding is checked, so a failed
    /// redemption burns it.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if client authentication fails
    /// - `InvalidGrant` if the code is unknown, expired, reused, or bound to
    ///   another client or redirect URI, or the PKCE verifier does not match
    /// - `InvalidRequest` if a PKCE-bound code is redeemed without a verifier
    pub async fn redeem_code(&self, redemption: &CodeRedemption) -> AuthResult<TokenTriple> {
        let client = self
            .clients
            .authenticate(&redemption.client_id, redemption.client_secret.as_deref())
            .await?;
        ClientValidator::check_grant(&client, GrantType::AuthorizationCode)?;

        let code = self.store.take_code(&redemption.code).ok_or_else(|| {
            warn!(client_id = %redemption.client_id, "Unknown, expired or reused authorization code");
            AuthError::invalid_grant("Invalid or expired authorization code")
        })?;

        if code.client_id != redemption.client_id {
            warn!(client_id = %redemption.client_id, "Authorization code issued to another client");
            return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
        }

        if code.redirect_uri != redemption.redirect_uri {
            warn!(client_id = %redemption.client_id, "Redirect URI differs from authorization request");
            return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
        }

        if code.requires_pkce() {
            let Some(verifier) = non_empty(&redemption.code_verifier) else {
                return Err(AuthError::invalid_request("code_verifier is required"));
            };
            let challenge = code.code_challenge.as_deref().unwrap_or_default();
            let method = code
                .code_challenge_method
                .unwrap_or(pkce::PkceChallengeMethod::Plain);
            if !pkce::verify(verifier, challenge, method) {
                warn!(client_id = %redemption.client_id, "PKCE verification failed");
                return Err(AuthError::PkceVerificationFailed);
            }
        }

        let user = find_or_create_user(self.users.as_ref(), &code.identity).await?;

        self.tokens
            .issue_for_subject(&user, &redemption.client_id, &code.scope)
            .await
    }

    /// Exchanges a refresh token after authenticating the client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` if client authentication fails,
    /// `UnauthorizedClient` if the client may not refresh, or `InvalidGrant`.
    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<TokenTriple> {
        let client = self.clients.authenticate(client_id, client_secret).await?;
        ClientValidator::check_grant(&client, GrantType::RefreshToken)?;
        self.tokens.refresh(refresh_token, client_id).await
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
