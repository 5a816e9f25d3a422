//! In-process store for pending authorization sessions and one-time codes.
//!
//! Sessions and codes live for minutes and must vanish the moment they are
//! used, so they are kept in memory only. A restart drops pending flows; the
//! client simply starts over.
//!
//! ## Single use
//!
//! [`SessionCodeStore::take_code`] and [`SessionCodeStore::take_session`]
//! remove the entry atomically and hand it to exactly one caller. Concurrent
//! redemptions of the same code race on the shard lock of the map; the loser
//! sees `None`.
//!
//! ## Expiry
//!
//! Expiry is checked lazily on every take, and a background sweep
//! ([`crate::sweeper`]) removes stale entries so abandoned flows do not
//! accumulate.

use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::OAuthConfig;
use crate::oauth::pkce::PkceChallengeMethod;
use crate::random::random_string;
use crate::types::ExternalIdentity;

/// Length of generated session ids, state values and codes.
pub const TOKEN_LENGTH: usize = 32;

/// A pending authorization request, waiting for the upstream callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Session id. Sent upstream as the `state` parameter.
    pub id: String,
    /// Client that started the flow.
    pub client_id: String,
    /// Validated redirect URI of the client.
    pub redirect_uri: String,
    /// The client's own `state`, echoed back on the final redirect.
    pub state: String,
    /// PKCE challenge, if the client sent one.
    pub code_challenge: Option<String>,
    /// PKCE method for `code_challenge`.
    pub code_challenge_method: Option<PkceChallengeMethod>,
    /// Requested scope.
    pub scope: String,
    /// When the session was created.
    pub created_at: OffsetDateTime,
}

impl AuthSession {
    /// Returns `true` if the session is older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        OffsetDateTime::now_utc() - self.created_at > max_age
    }
}

/// A one-time authorization code bound to a client, redirect URI and
/// optional PKCE challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The code value.
    pub code: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,
    /// PKCE challenge inherited from the session.
    pub code_challenge: Option<String>,
    /// PKCE method inherited from the session.
    pub code_challenge_method: Option<PkceChallengeMethod>,
    /// Scope inherited from the session.
    pub scope: String,
    /// Identity asserted by the upstream provider.
    pub identity: ExternalIdentity,
    /// Absolute expiry.
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if a PKCE challenge is bound to the code.
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        self.code_challenge.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Counts of entries removed by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired codes removed.
    pub codes: usize,
    /// Stale sessions removed.
    pub sessions: usize,
}

/// Concurrent store of sessions (by session id) and codes (by code value).
#[derive(Debug)]
pub struct SessionCodeStore {
    sessions: DashMap<String, AuthSession>,
    codes: DashMap<String, AuthorizationCode>,
    session_lifetime: Duration,
    code_lifetime: Duration,
}

impl Default for SessionCodeStore {
    fn default() -> Self {
        Self::from_config(&OAuthConfig::default())
    }
}

impl SessionCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(session_lifetime: Duration, code_lifetime: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            codes: DashMap::new(),
            session_lifetime,
            code_lifetime,
        }
    }

    /// Creates an empty store with the lifetimes from the OAuth config.
    #[must_use]
    pub fn from_config(config: &OAuthConfig) -> Self {
        Self::new(config.session_lifetime, config.authorization_code_lifetime)
    }

    /// Lifetime of newly issued codes.
    #[must_use]
    pub fn code_lifetime(&self) -> Duration {
        self.code_lifetime
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Stores a pending session under its id.
    pub fn put_session(&self, session: AuthSession) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Returns a copy of a live session without removing it.
    #[must_use]
    pub fn get_session(&self, id: &str) -> Option<AuthSession> {
        self.sessions
            .get(id)
            .filter(|s| !s.is_stale(self.session_lifetime))
            .map(|s| s.value().clone())
    }

    /// Removes a session.
    pub fn delete_session(&self, id: &str) -> Option<AuthSession> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Atomically removes and returns a live session.
    ///
    /// Stale sessions are removed as well but not returned.
    #[must_use]
    pub fn take_session(&self, id: &str) -> Option<AuthSession> {
        let (_, session) = self.sessions.remove(id)?;
        if session.is_stale(self.session_lifetime) {
            debug!("Discarded stale authorization session");
            return None;
        }
        Some(session)
    }

    // ------------------------------------------------------------------
    // Codes
    // ------------------------------------------------------------------

    /// Creates a code bound to the session and identity, stores it and
    /// returns a copy.
    #[must_use]
    pub fn issue_code(&self, session: &AuthSession, identity: ExternalIdentity) -> AuthorizationCode {
        let code = AuthorizationCode {
            code: random_string(TOKEN_LENGTH),
            client_id: session.client_id.clone(),
            redirect_uri: session.redirect_uri.clone(),
            code_challenge: session.code_challenge.clone(),
            code_challenge_method: session.code_challenge_method,
            scope: session.scope.clone(),
            identity,
            expires_at: OffsetDateTime::now_utc() + self.code_lifetime,
        };
        self.put_code(code.clone());
        code
    }

    /// Stores a code under its value.
    pub fn put_code(&self, code: AuthorizationCode) {
        self.codes.insert(code.code.clone(), code);
    }

    /// Returns a copy of a live code without removing it.
    #[must_use]
    pub fn get_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes
            .get(code)
            .filter(|c| !c.is_expired())
            .map(|c| c.value().clone())
    }

    /// Removes a code.
    pub fn delete_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.remove(code).map(|(_, c)| c)
    }

    /// Atomically removes and returns a live code.
    ///
    /// At most one caller ever receives a given code. Expired codes are
    /// removed as well but not returned.
    #[must_use]
    pub fn take_code(&self, code: &str) -> Option<AuthorizationCode> {
        let (_, entry) = self.codes.remove(code)?;
        if entry.is_expired() {
            debug!(client_id = %entry.client_id, "Discarded expired authorization code");
            return None;
        }
        Some(entry)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Removes expired codes and stale sessions.
    pub fn sweep(&self) -> SweepStats {
        let codes_before = self.codes.len();
        self.codes.retain(|_, c| !c.is_expired());

        let sessions_before = self.sessions.len();
        let max_age = self.session_lifetime;
        self.sessions.retain(|_, s| !s.is_stale(max_age));

        SweepStats {
            codes: codes_before.saturating_sub(self.codes.len()),
            sessions: sessions_before.saturating_sub(self.sessions.len()),
        }
    }

    /// Number of pending sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of outstanding codes.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }
}
