//! Connection pool management.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::Postgres;
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::{PgPool, StorageResult};

/// Creates a connection pool from the given configuration.
///
/// # Errors
///
/// Returns an error if the first connection cannot be established.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> StorageResult<PgPool> {
    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        "Creating PostgreSQL connection pool"
    );

    let pool = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .connect(&config.url)
        .await?;

    debug!("PostgreSQL connection pool created");

    Ok(pool)
}

/// Masks the password in a database URL for logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@')
        && let Some(colon_pos) = url[..at_pos].rfind(':')
    {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if colon_pos > scheme_end {
            return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://auth:s3cret@db:5432/idbridge"),
            "postgres://auth:****@db:5432/idbridge"
        );
    }

    #[test]
    fn test_mask_password_without_credentials() {
        assert_eq!(
            mask_password("postgres://db:5432/idbridge"),
            "postgres://db:5432/idbridge"
        );
        assert_eq!(
            mask_password("postgres://auth@db/idbridge"),
            "postgres://auth@db/idbridge"
        );
    }
}
