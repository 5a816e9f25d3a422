pub mod config;
pub mod observability;
pub mod server;

pub use config::{AppConfig, ClientSeed, LoggingConfig, ServerConfig, StorageBackend, StorageConfig};
pub use observability::{apply_logging_level, init_tracing, init_tracing_with_level};
pub use server::{BuiltApp, IdbridgeServer, StorageBackends, build_app, build_app_with_storage};
