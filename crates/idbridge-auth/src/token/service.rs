//! Token lifecycle coordinator.
//!
//! [`TokenService`] is the only component that talks to both the
//! [`JwtService`] and durable token storage. It handles:
//!
//! - Issuing a token triple (access, refresh, ID) for a subject
//! - Refreshing with a refresh token, optionally rotating it
//! - Revoking access and refresh tokens
//! - Introspecting access tokens
//!
//! # Usage
//!
//! ```ignore
//! use idbridge_auth::token::{TokenConfig, TokenService};
//!
//! let service = TokenService::new(jwt, users, refresh_tokens, revoked, TokenConfig::default());
//! let triple = service.issue_for_subject(&user, "demo", "openid email").await?;
//! let refreshed = service.refresh(&triple.refresh_token, "demo").await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{RefreshTokenStorage, RevokedTokenStorage, UserStorage};
use crate::token::introspection::IntrospectionResponse;
use crate::token::jwt::{JwtError, JwtService, TokenClaims, TokenKind};
use crate::token::revocation::{TokenTypeHint, token_fingerprint};
use crate::types::{RefreshToken, User};

/// Access, refresh and ID token issued together.
#[derive(Debug, Clone, Serialize)]
pub struct TokenTriple {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token. Its fingerprint has been persisted.
    pub refresh_token: String,
    /// OpenID Connect ID token.
    pub id_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Granted scope.
    pub scope: String,
}

/// Configuration for the token service.
#[derive(Debug, Clone, Default)]
pub struct TokenConfig {
    /// Whether to revoke a refresh token when it is used.
    /// When false, a refresh token stays valid until it expires or is
    /// explicitly revoked.
    pub rotate_refresh_tokens: bool,
}

impl TokenConfig {
    /// Sets whether to rotate refresh tokens on use.
    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }
}

/// Token service for issuing and managing tokens.
pub struct TokenService {
    /// JWT service for signing/verifying tokens.
    jwt: Arc<JwtService>,

    /// User directory, consulted on refresh to rebuild profile claims.
    users: Arc<dyn UserStorage>,

    /// Durable refresh token records.
    refresh_tokens: Arc<dyn RefreshTokenStorage>,

    /// Revocation ledger.
    revoked: Arc<dyn RevokedTokenStorage>,

    /// Service configuration.
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        users: Arc<dyn UserStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        revoked: Arc<dyn RevokedTokenStorage>,
        config: TokenConfig,
    ) -> Self {
        Self {
            jwt,
            users,
            refresh_tokens,
            revoked,
            config,
        }
    }

    /// Gets the JWT service reference.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mints a token triple for a user and persists the refresh record.
    ///
    /// This is the only path that writes a new refresh token record. If the
    /// record cannot be written, no tokens are returned.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if signing fails, or the storage error if the
    /// refresh record cannot be persisted.
    pub async fn issue_for_subject(
        &self,
        user: &User,
        client_id: &str,
        scope: &str,
    ) -> AuthResult<TokenTriple> {
        let access = self
            .jwt
            .issue_access(user, client_id, scope)
            .map_err(signing_failed)?;
        let refresh = self.jwt.issue_refresh(&user.id).map_err(signing_failed)?;
        let id = self.jwt.issue_id(user, client_id).map_err(signing_failed)?;

        let record = RefreshToken::new(
            &refresh.value,
            client_id,
            &user.id,
            scope,
            refresh.expires_at,
        );
        if let Err(e) = self.refresh_tokens.create(&record).await {
            warn!(client_id = %client_id, user_id = %user.id, error = %e, "Failed to persist refresh token");
            return Err(e);
        }

        info!(client_id = %client_id, user_id = %user.id, "Issued token triple");

        Ok(TokenTriple {
            access_token: access.value,
            refresh_token: refresh.value,
            id_token: id.value,
            expires_in: self.jwt.lifetimes().access.whole_seconds().max(0) as u64,
            scope: scope.to_string(),
        })
    }

    /// Exchanges a refresh token for a new triple with the same subject and
    /// scope.
    ///
    /// Both the JWT (signature, expiry, type) and the durable record (exists,
    /// not revoked, not expired, same client) must check out.
    ///
    /// With rotation on, the presented token is revoked after the new triple
    /// is persisted, and only one of several concurrent refreshes of the same
    /// token succeeds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` for any failed check, or a storage error.
    pub async fn refresh(&self, refresh_token: &str, client_id: &str) -> AuthResult<TokenTriple> {
        let claims = self
            .jwt
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!(client_id = %client_id, error = %e, "Refresh token rejected");
                invalid_refresh_token()
            })?;

        let token_hash = token_fingerprint(refresh_token);
        let record = self
            .refresh_tokens
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(invalid_refresh_token)?;

        self.validate_refresh_record(&record, claims.subject(), client_id)?;

        if self.revoked.is_revoked(&token_hash).await? {
            warn!(client_id = %client_id, "Refresh token is in the revocation ledger");
            return Err(invalid_refresh_token());
        }

        let user = self.users.find_by_id(&record.user_id).await?.ok_or_else(|| {
            warn!(client_id = %client_id, user_id = %record.user_id, "Refresh token subject no longer exists");
            invalid_refresh_token()
        })?;

        let triple = self.issue_for_subject(&user, client_id, &record.scope).await?;

        if self.config.rotate_refresh_tokens {
            // The old record is retired only once its successor is durable.
            // Of several concurrent refreshes, only the one whose revoke
            // flips the record wins; the others withdraw what they minted.
            match self.refresh_tokens.revoke(&token_hash).await {
                Ok(true) => debug!(client_id = %client_id, "Rotated refresh token"),
                Ok(false) => {
                    warn!(client_id = %client_id, "Refresh token already rotated by a concurrent request");
                    self.withdraw(&triple).await;
                    return Err(invalid_refresh_token());
                }
                Err(e) => {
                    self.withdraw(&triple).await;
                    return Err(e);
                }
            }
        }

        Ok(triple)
    }

    /// Revokes the refresh record of a triple that is never handed out.
    async fn withdraw(&self, triple: &TokenTriple) {
        let hash = token_fingerprint(&triple.refresh_token);
        if let Err(e) = self.refresh_tokens.revoke(&hash).await {
            warn!(error = %e, "Failed to withdraw unissued refresh token");
        }
    }

    fn validate_refresh_record(
        &self,
        record: &RefreshToken,
        subject: &str,
        client_id: &str,
    ) -> AuthResult<()> {
        if record.client_id != client_id {
            warn!(client_id = %client_id, "Refresh token presented by another client");
            return Err(invalid_refresh_token());
        }

        if record.user_id != subject {
            warn!(client_id = %client_id, "Refresh record subject does not match token");
            return Err(invalid_refresh_token());
        }

        if record.is_revoked() {
            warn!(client_id = %client_id, "Revoked refresh token presented");
            return Err(invalid_refresh_token());
        }

        if record.is_expired() {
            debug!(client_id = %client_id, "Expired refresh record presented");
            return Err(invalid_refresh_token());
        }

        Ok(())
    }

    /// Revokes an access or refresh token.
    ///
    /// The token is verified only to recover its kind and expiry; the hint
    /// decides which kind is tried first. Its fingerprint goes into the
    /// ledger until the token's own expiry, and for refresh tokens the
    /// durable record is marked revoked as well.
    ///
    /// Tokens that verify as neither kind (garbage, expired, foreign) are
    /// ignored and reported as success.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger or record update fails.
    pub async fn revoke(&self, token: &str, hint: Option<TokenTypeHint>) -> AuthResult<()> {
        let order = match hint {
            Some(TokenTypeHint::RefreshToken) => [TokenKind::Refresh, TokenKind::Access],
            _ => [TokenKind::Access, TokenKind::Refresh],
        };

        let Some(claims) = order
            .into_iter()
            .find_map(|kind| self.jwt.verify(token, kind).ok())
        else {
            debug!("Ignoring revocation of unrecognized token");
            return Ok(());
        };

        let fingerprint = token_fingerprint(token);
        self.revoked
            .revoke(&fingerprint, claims.expires_at())
            .await?;

        if claims.kind() == TokenKind::Refresh {
            self.refresh_tokens.revoke(&fingerprint).await?;
        }

        info!(kind = %claims.kind(), sub = %claims.subject(), "Token revoked");
        Ok(())
    }

    /// Reports whether an access token is active. Never fails.
    ///
    /// Invalid, expired, foreign and revoked tokens, as well as tokens that
    /// cannot be checked against the ledger, are all reported as inactive.
    pub async fn introspect(&self, token: &str) -> IntrospectionResponse {
        let claims = match self.jwt.verify(token, TokenKind::Access) {
            Ok(TokenClaims::Access(claims)) => claims,
            Ok(_) | Err(_) => return IntrospectionResponse::inactive(),
        };

        match self.revoked.is_revoked(&token_fingerprint(token)).await {
            Ok(false) => IntrospectionResponse::from_access_claims(claims),
            Ok(true) => IntrospectionResponse::inactive(),
            Err(e) => {
                warn!(error = %e, "Revocation check failed during introspection");
                IntrospectionResponse::inactive()
            }
        }
    }

    /// Verifies a bearer access token and checks the ledger.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken`, `TokenExpired` or `TokenRevoked`.
    pub async fn authenticate_access(&self, token: &str) -> AuthResult<TokenClaims> {
        let claims = self
            .jwt
            .verify(token, TokenKind::Access)
            .map_err(|e| match e {
                JwtError::Expired => AuthError::TokenExpired,
                _ => AuthError::invalid_token("Invalid access token"),
            })?;

        if self.revoked.is_revoked(&token_fingerprint(token)).await? {
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }
}

fn invalid_refresh_token() -> AuthError {
    AuthError::invalid_grant("Invalid refresh token")
}

fn signing_failed(err: JwtError) -> AuthError {
    AuthError::internal(format!("Failed to sign token: {err}"))
}

// ============================================================================
// Tests
// ============================================================================
