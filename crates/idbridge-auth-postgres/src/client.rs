//! OAuth client storage.

use std::sync::Arc;

use async_trait::async_trait;
use idbridge_auth::AuthResult;
use idbridge_auth::storage::ClientStorage;
use idbridge_auth::types::{Client, ClientType, GrantType};
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::warn;

use crate::{PgPool, StorageError};

type ClientTuple = (
    String,
    Option<String>,
    String,
    String,
    Vec<String>,
    Vec<String>,
    String,
    OffsetDateTime,
    OffsetDateTime,
);

const CLIENT_COLUMNS: &str = "client_id, client_secret, name, client_type, redirect_uris, \
                              grant_types, scope, created_at, updated_at";

fn row_to_client(row: ClientTuple) -> Client {
    let (
        client_id,
        client_secret,
        name,
        client_type,
        redirect_uris,
        grant_types,
        scope,
        created_at,
        updated_at,
    ) = row;

    let grant_types = grant_types
        .iter()
        .filter_map(|g| {
            let parsed = GrantType::parse(g);
            if parsed.is_none() {
                warn!(client_id = %client_id, grant_type = %g, "Ignoring unknown stored grant type");
            }
            parsed
        })
        .collect();

    Client {
        client_id,
        client_secret,
        name,
        client_type: ClientType::parse(&client_type),
        redirect_uris,
        grant_types,
        scope,
        created_at,
        updated_at,
    }
}

/// Client registrations in the `oauth_clients` table.
#[derive(Debug, Clone)]
pub struct PostgresClientStorage {
    pool: Arc<PgPool>,
}

impl PostgresClientStorage {
    /// Creates a client storage over the pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStorage for PostgresClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        let row: Option<ClientTuple> = query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM oauth_clients WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(row_to_client))
    }

    async fn create(&self, client: &Client) -> AuthResult<Client> {
        let grant_types: Vec<String> = client
            .grant_types
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();

        let row: ClientTuple = query_as(&format!(
            r#"
            INSERT INTO oauth_clients ({CLIENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(&client.name)
        .bind(client.client_type.as_str())
        .bind(&client.redirect_uris)
        .bind(&grant_types)
        .bind(&client.scope)
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, format!("client '{}'", client.client_id)))?;

        Ok(row_to_client(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(grant_types: Vec<&str>, client_type: &str) -> ClientTuple {
        let now = OffsetDateTime::now_utc();
        (
            "demo".to_string(),
            None,
            "Demo".to_string(),
            client_type.to_string(),
            vec!["http://x/cb".to_string()],
            grant_types.into_iter().map(String::from).collect(),
            "openid".to_string(),
            now,
            now,
        )
    }

    #[test]
    fn test_row_to_client() {
        let client = row_to_client(tuple(vec!["authorization_code", "refresh_token"], "public"));
        assert_eq!(client.client_id, "demo");
        assert_eq!(client.client_type, ClientType::Public);
        assert_eq!(
            client.grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert!(client.is_redirect_uri_allowed("http://x/cb"));
    }

    #[test]
    fn test_row_to_client_skips_unknown_grants() {
        let client = row_to_client(tuple(vec!["password", "refresh_token"], "confidential"));
        assert_eq!(client.grant_types, vec![GrantType::RefreshToken]);
        assert!(client.is_confidential());
    }
}
