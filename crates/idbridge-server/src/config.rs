use idbridge_auth::config::AuthConfig;
use idbridge_auth::secret::hash_client_secret;
use idbridge_auth::types::{Client, ClientType, GrantType};
use idbridge_auth_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authorization engine configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Client registrations created at startup
    #[serde(default)]
    pub clients: Vec<ClientSeed>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        if self.storage.backend == StorageBackend::Postgres && self.storage.postgres.url.is_empty()
        {
            return Err("storage.postgres.url is required for the postgres backend".into());
        }

        self.auth.validate().map_err(|e| format!("auth: {e}"))?;

        for (i, seed) in self.clients.iter().enumerate() {
            if seed.client_id.is_empty() {
                return Err(format!("clients[{i}].client_id cannot be empty"));
            }
            if seed.redirect_uris.is_empty() {
                return Err(format!(
                    "clients[{i}] ('{}') needs at least one redirect_uri",
                    seed.client_id
                ));
            }
        }

        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            body_limit_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; everything is lost on restart.
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

/// A client registration seeded at startup.
///
/// `client_secret` is the plain secret; it is hashed before it reaches
/// storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSeed {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_types: Vec<GrantType>,
    #[serde(default)]
    pub scope: String,
}

impl ClientSeed {
    /// Builds the stored registration. A seed with a secret is confidential.
    pub fn to_client(&self) -> Result<Client, String> {
        let client_secret = self
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(hash_client_secret)
            .transpose()
            .map_err(|e| format!("failed to hash secret for '{}': {e}", self.client_id))?;

        let client_type = if client_secret.is_some() {
            ClientType::Confidential
        } else {
            ClientType::Public
        };

        let now = OffsetDateTime::now_utc();
        Ok(Client {
            client_id: self.client_id.clone(),
            client_secret,
            name: self.name.clone().unwrap_or_else(|| self.client_id.clone()),
            client_type,
            redirect_uris: self.redirect_uris.clone(),
            grant_types: self.grant_types.clone(),
            scope: self.scope.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("idbridge.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            tracing::warn!(path = %pathbuf.display(), "Config file not found, using defaults");
        }
        // Environment variable overrides, e.g., IDBRIDGE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("IDBRIDGE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
