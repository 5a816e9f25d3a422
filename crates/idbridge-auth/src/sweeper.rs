//! Background expiry sweep.
//!
//! One task, one interval: expired codes and stale sessions are dropped from
//! the in-process store, and expired refresh records and ledger entries are
//! purged from durable storage.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::oauth::store::SessionCodeStore;
use crate::storage::{RefreshTokenStorage, RevokedTokenStorage};

/// Everything the sweep touches.
#[derive(Clone)]
pub struct Sweeper {
    store: Arc<SessionCodeStore>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    revoked: Arc<dyn RevokedTokenStorage>,
}

impl Sweeper {
    /// Creates a sweeper over the given stores.
    #[must_use]
    pub fn new(
        store: Arc<SessionCodeStore>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        revoked: Arc<dyn RevokedTokenStorage>,
    ) -> Self {
        Self {
            store,
            refresh_tokens,
            revoked,
        }
    }

    /// Runs one sweep. Durable storage failures are logged and skipped.
    pub async fn sweep_once(&self) {
        let stats = self.store.sweep();
        if stats.codes > 0 || stats.sessions > 0 {
            debug!(
                codes = stats.codes,
                sessions = stats.sessions,
                "Swept authorization store"
            );
        }

        match self.refresh_tokens.cleanup_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Removed expired refresh tokens"),
            Err(e) => warn!(error = %e, "Refresh token cleanup failed"),
        }

        match self.revoked.cleanup_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Removed expired revocation entries"),
            Err(e) => warn!(error = %e, "Revocation ledger cleanup failed"),
        }
    }

    /// Starts the sweep loop. It stops when `shutdown` flips to `true` or
    /// its sender is dropped.
    pub fn spawn(self, every: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval = ?every, "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = interval.tick() => self.sweep_once().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::store::AuthSession;
    use crate::storage::{MemoryRefreshTokenStorage, MemoryRevokedTokenStorage};
    use crate::types::{ExternalIdentity, RefreshToken};
    use time::OffsetDateTime;

    fn stale_session() -> AuthSession {
        AuthSession {
            id: "old".to_string(),
            client_id: "demo".to_string(),
            redirect_uri: "http://x/cb".to_string(),
            state: "s".to_string(),
            code_challenge: None,
            code_challenge_method: None,
            scope: String::new(),
            created_at: OffsetDateTime::now_utc() - time::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_sweep_once_covers_all_stores() {
        let store = Arc::new(SessionCodeStore::default());
        let refresh = Arc::new(MemoryRefreshTokenStorage::new());
        let revoked = Arc::new(MemoryRevokedTokenStorage::new());

        store.put_session(stale_session());
        let mut code = store.issue_code(&stale_session(), ExternalIdentity::default());
        code.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        store.put_code(code);

        let past = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        refresh
            .create(&RefreshToken::new("t", "demo", "u", "", past))
            .await
            .unwrap();
        revoked.revoke("fp", past).await.unwrap();

        Sweeper::new(store.clone(), refresh.clone(), revoked.clone())
            .sweep_once()
            .await;

        assert_eq!(store.session_count(), 0);
        assert_eq!(store.code_count(), 0);
        assert!(refresh.is_empty());
        assert!(revoked.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_stops_on_shutdown() {
        let store = Arc::new(SessionCodeStore::default());
        store.put_session(stale_session());

        let (tx, rx) = watch::channel(false);
        let handle = Sweeper::new(
            store.clone(),
            Arc::new(MemoryRefreshTokenStorage::new()),
            Arc::new(MemoryRevokedTokenStorage::new()),
        )
        .spawn(Duration::from_millis(10), rx);

        // first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.session_count(), 0);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
