//! User storage.
//!
//! Users are created on first federated login and matched afterwards by
//! upstream subject, then by email.

use std::sync::Arc;

use async_trait::async_trait;
use idbridge_auth::AuthResult;
use idbridge_auth::storage::UserStorage;
use idbridge_auth::types::User;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError};

type UserTuple = (
    String,
    String,
    bool,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

const USER_COLUMNS: &str = "id, email, email_verified, name, given_name, family_name, picture, \
                            external_id, created_at, updated_at";

fn row_to_user(row: UserTuple) -> User {
    let (
        id,
        email,
        email_verified,
        name,
        given_name,
        family_name,
        picture,
        external_id,
        created_at,
        updated_at,
    ) = row;

    User {
        id,
        email,
        email_verified,
        name,
        given_name,
        family_name,
        picture,
        external_id,
        created_at,
        updated_at,
    }
}

/// Local users in the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserStorage {
    pool: Arc<PgPool>,
}

impl PostgresUserStorage {
    /// Creates a user storage over the pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> = query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(row_to_user))
    }
}

#[async_trait]
impl UserStorage for PostgresUserStorage {
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        self.find_one("id", id).await
    }

    async fn find_by_external_id(&self, external_id: &str) -> AuthResult<Option<User>> {
        self.find_one("external_id", external_id).await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        if email.is_empty() {
            return Ok(None);
        }
        self.find_one("email", email).await
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        query(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.name)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.picture)
        .bind(&user.external_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, format!("user '{}'", user.id)))?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE users
            SET email = $2,
                email_verified = $3,
                name = $4,
                given_name = $5,
                family_name = $6,
                picture = $7,
                external_id = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.name)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.picture)
        .bind(&user.external_id)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("user '{}'", user.id)).into());
        }
        Ok(())
    }
}
