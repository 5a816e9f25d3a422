use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use idbridge_auth::Sweeper;
use idbridge_auth::federation::GoogleFederation;
use idbridge_auth::http::{AppState, router};
use idbridge_auth::oauth::{AuthorizationService, ClientValidator, SessionCodeStore};
use idbridge_auth::storage::{
    ClientStorage, MemoryClientStorage, MemoryRefreshTokenStorage, MemoryRevokedTokenStorage,
    MemoryUserStorage, RefreshTokenStorage, RevokedTokenStorage, UserStorage,
};
use idbridge_auth::token::{JwtService, SigningKey, TokenConfig, TokenLifetimes, TokenService};
use idbridge_auth_postgres::PostgresAuthStorage;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ClientSeed, StorageBackend, StorageConfig};

/// The four stores the engine persists through.
#[derive(Clone)]
pub struct StorageBackends {
    pub clients: Arc<dyn ClientStorage>,
    pub users: Arc<dyn UserStorage>,
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
    pub revoked: Arc<dyn RevokedTokenStorage>,
}

impl StorageBackends {
    pub fn memory() -> Self {
        Self {
            clients: Arc::new(MemoryClientStorage::new()),
            users: Arc::new(MemoryUserStorage::new()),
            refresh_tokens: Arc::new(MemoryRefreshTokenStorage::new()),
            revoked: Arc::new(MemoryRevokedTokenStorage::new()),
        }
    }

    pub fn postgres(storage: &PostgresAuthStorage) -> Self {
        Self {
            clients: storage.clients(),
            users: storage.users(),
            refresh_tokens: storage.refresh_tokens(),
            revoked: storage.revoked_tokens(),
        }
    }

    pub async fn from_config(cfg: &StorageConfig) -> anyhow::Result<Self> {
        match cfg.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; users, refresh tokens and revocations are lost on restart");
                Ok(Self::memory())
            }
            StorageBackend::Postgres => {
                let storage = PostgresAuthStorage::connect(&cfg.postgres)
                    .await
                    .context("connecting to PostgreSQL")?;
                Ok(Self::postgres(&storage))
            }
        }
    }

    /// Registers seeded clients that are not stored yet. Existing
    /// registrations are left untouched.
    pub async fn seed_clients(&self, seeds: &[ClientSeed]) -> anyhow::Result<()> {
        for seed in seeds {
            if self.clients.find_by_client_id(&seed.client_id).await?.is_some() {
                debug!(client_id = %seed.client_id, "Seed client already registered");
                continue;
            }
            let client = seed.to_client().map_err(anyhow::Error::msg)?;
            self.clients
                .create(&client)
                .await
                .with_context(|| format!("registering client '{}'", seed.client_id))?;
            info!(
                client_id = %client.client_id,
                client_type = client.client_type.as_str(),
                "Registered seed client"
            );
        }
        Ok(())
    }
}

/// Router plus the background sweep that belongs to it.
pub struct BuiltApp {
    pub router: Router,
    pub sweeper: Sweeper,
    pub sweep_interval: Duration,
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<BuiltApp> {
    let storage = StorageBackends::from_config(&cfg.storage).await?;
    build_app_with_storage(cfg, storage).await
}

pub async fn build_app_with_storage(
    cfg: &AppConfig,
    storage: StorageBackends,
) -> anyhow::Result<BuiltApp> {
    let auth = &cfg.auth;
    if let Err(e) = auth.validate_for_production() {
        warn!(error = %e, "Auth configuration is not production ready");
    }

    storage.seed_clients(&cfg.clients).await?;

    let key = SigningKey::from_config(&auth.signing).context("loading signing key")?;
    let jwt = Arc::new(
        JwtService::new(key, &auth.issuer, &auth.audience)
            .with_lifetimes(TokenLifetimes::from(&auth.oauth)),
    );
    let tokens = Arc::new(TokenService::new(
        jwt,
        storage.users.clone(),
        storage.refresh_tokens.clone(),
        storage.revoked.clone(),
        TokenConfig::default().with_rotate_refresh_tokens(auth.oauth.rotate_refresh_tokens),
    ));

    let store = Arc::new(SessionCodeStore::from_config(&auth.oauth));
    let federation = GoogleFederation::new(auth.federation.clone())
        .context("configuring upstream identity provider")?;
    let clients = ClientValidator::new(storage.clients.clone())
        .with_dynamic_clients(auth.oauth.allow_dynamic_clients);
    if auth.oauth.allow_dynamic_clients {
        warn!("Dynamic client registration is enabled; unknown clients are accepted");
    }

    let authorization = Arc::new(
        AuthorizationService::new(
            clients,
            store.clone(),
            tokens,
            storage.users.clone(),
            Arc::new(federation),
        )
        .with_default_scope(auth.oauth.default_scope.clone()),
    );

    let state = AppState::new(authorization, storage.users.clone());
    let sweeper = Sweeper::new(store, storage.refresh_tokens, storage.revoked);

    Ok(BuiltApp {
        router: with_middleware(router(state), cfg.server.body_limit_bytes),
        sweeper,
        sweep_interval: auth.oauth.sweep_interval,
    })
}

fn with_middleware(app: Router, body_limit: usize) -> Router {
    app.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    // Path only: the query carries codes and state.
                    .make_span_with(|req: &axum::http::Request<_>| {
                        tracing::info_span!(
                            "http.request",
                            http.method = %req.method(),
                            http.path = %req.uri().path(),
                        )
                    })
                    .on_response(
                        |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                            tracing::info!(
                                http.status = %res.status().as_u16(),
                                elapsed_ms = %latency.as_millis(),
                                "request handled"
                            );
                        },
                    ),
            )
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new()),
    )
    .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct IdbridgeServer {
    addr: SocketAddr,
    app: BuiltApp,
}

impl IdbridgeServer {
    pub fn new(addr: SocketAddr, app: BuiltApp) -> Self {
        Self { addr, app }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = self
            .app
            .sweeper
            .spawn(self.app.sweep_interval, shutdown_rx);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("binding {}", self.addr))?;
        info!("listening on {}", self.addr);

        let served = axum::serve(listener, self.app.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        let _ = shutdown_tx.send(true);
        let _ = sweeper.await;

        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(id: &str, secret: Option<&str>) -> ClientSeed {
        ClientSeed {
            client_id: id.into(),
            client_secret: secret.map(String::from),
            name: None,
            redirect_uris: vec!["http://x/cb".into()],
            grant_types: vec![],
            scope: String::new(),
        }
    }

    #[tokio::test]
    async fn test_seed_clients_is_idempotent() {
        let storage = StorageBackends::memory();
        let seeds = [seed("spa", None), seed("backend", Some("s3cret"))];

        storage.seed_clients(&seeds).await.unwrap();
        let first = storage
            .clients
            .find_by_client_id("backend")
            .await
            .unwrap()
            .unwrap();

        storage.seed_clients(&seeds).await.unwrap();
        let second = storage
            .clients
            .find_by_client_id("backend")
            .await
            .unwrap()
            .unwrap();

        assert!(second.is_confidential());
        assert_eq!(first.client_secret, second.client_secret);
        assert!(
            storage
                .clients
                .find_by_client_id("spa")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_build_app_with_memory_storage() {
        let mut cfg = AppConfig::default();
        cfg.clients.push(seed("spa", None));

        let app = build_app_with_storage(&cfg, StorageBackends::memory())
            .await
            .unwrap();
        assert_eq!(app.sweep_interval, cfg.auth.oauth.sweep_interval);
    }

    #[tokio::test]
    async fn test_build_app_rejects_missing_rsa_key() {
        let mut cfg = AppConfig::default();
        cfg.auth.signing.algorithm = "RS256".into();
        cfg.auth.signing.private_key_path = Some("/nonexistent/key.pem".into());

        let result = build_app_with_storage(&cfg, StorageBackends::memory()).await;
        assert!(result.is_err());
    }
}
