//! Client authentication and redirect URI binding.
//!
//! # Authentication Methods
//!
//! - `none` - public clients; any presented secret is ignored and PKCE
//!   binds the code instead
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in the request body
//!
//! When both Basic Auth and body credentials are present, Basic Auth wins.
//!
//! Redirect URIs are compared by exact string match; prefix or pattern
//! matching would open the authorization endpoint to open-redirect abuse.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AuthError;
use crate::secret::verify_client_secret;
use crate::storage::ClientStorage;
use crate::types::{Client, GrantType};

/// Client authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientAuthError {
    /// No client is registered under the id.
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// Confidential client presented a missing or wrong secret.
    #[error("Client secret mismatch")]
    BadSecret,

    /// The redirect URI is not registered for the client.
    #[error("Redirect URI not registered: {0}")]
    RedirectMismatch(String),

    /// The client may not use the grant type.
    #[error("Client not authorized for grant type {0}")]
    GrantNotAllowed(GrantType),

    /// The client directory failed.
    #[error("Client lookup failed: {0}")]
    Storage(#[source] AuthError),
}

impl From<ClientAuthError> for AuthError {
    fn from(err: ClientAuthError) -> Self {
        match err {
            ClientAuthError::UnknownClient(_) | ClientAuthError::BadSecret => {
                AuthError::invalid_client("Invalid client credentials")
            }
            ClientAuthError::RedirectMismatch(_) => {
                AuthError::invalid_request("redirect_uri is not registered for this client")
            }
            ClientAuthError::GrantNotAllowed(grant) => AuthError::unauthorized_client(format!(
                "Client not authorized for {grant} grant"
            )),
            ClientAuthError::Storage(e) => e,
        }
    }
}

/// Credentials presented at the token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client id.
    pub client_id: String,
    /// Client secret, if one was presented.
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// Picks credentials from an `Authorization` header or the request body,
    /// preferring the header.
    #[must_use]
    pub fn from_request(
        authorization: Option<&str>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> Option<Self> {
        if let Some((client_id, client_secret)) = authorization.and_then(parse_basic_auth) {
            return Some(Self {
                client_id,
                client_secret: Some(client_secret),
            });
        }

        let client_id = body_client_id.filter(|id| !id.is_empty())?;
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: body_client_secret
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

/// Authenticates clients against the client directory.
pub struct ClientValidator {
    clients: Arc<dyn ClientStorage>,
    allow_dynamic_clients: bool,
}

impl ClientValidator {
    /// Creates a validator. Dynamic clients are off.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientStorage>) -> Self {
        Self {
            clients,
            allow_dynamic_clients: false,
        }
    }

    /// Registers unknown clients as public clients on first authorization
    /// request. Development convenience only: it turns every client id into
    /// a valid one.
    #[must_use]
    pub fn with_dynamic_clients(mut self, allow: bool) -> Self {
        self.allow_dynamic_clients = allow;
        self
    }

    /// Looks up a client.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClient` or `Storage`.
    pub async fn lookup(&self, client_id: &str) -> Result<Client, ClientAuthError> {
        self.clients
            .find_by_client_id(client_id)
            .await
            .map_err(ClientAuthError::Storage)?
            .ok_or_else(|| ClientAuthError::UnknownClient(client_id.to_string()))
    }

    /// Resolves the client for an authorization request and checks the
    /// redirect URI.
    ///
    /// With dynamic clients enabled, an unknown client id is registered as a
    /// public client with the presented redirect URI.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClient`, `RedirectMismatch`, `GrantNotAllowed` or
    /// `Storage`.
    pub async fn authorize_request(
        &self,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<Client, ClientAuthError> {
        let client = match self.lookup(client_id).await {
            Err(ClientAuthError::UnknownClient(_)) if self.allow_dynamic_clients => {
                let client = Client::public(client_id, vec![redirect_uri.to_string()]);
                let created = self
                    .clients
                    .create(&client)
                    .await
                    .map_err(ClientAuthError::Storage)?;
                info!(client_id = %client_id, redirect_uri = %redirect_uri, "Registered dynamic client");
                created
            }
            other => other?,
        };

        Self::validate_redirect(&client, redirect_uri)?;
        Self::check_grant(&client, GrantType::AuthorizationCode)?;
        Ok(client)
    }

    /// Authenticates a client at the token endpoint.
    ///
    /// Confidential clients must present a secret that verifies against the
    /// stored hash; public clients' secrets are ignored.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClient`, `BadSecret` or `Storage`.
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Client, ClientAuthError> {
        let client = self.lookup(client_id).await.inspect_err(|e| {
            if matches!(e, ClientAuthError::UnknownClient(_)) {
                warn!(client_id = %client_id, "Authentication attempt for unknown client");
            }
        })?;

        if client.is_confidential() {
            let verified = match (client_secret, client.client_secret.as_deref()) {
                (Some(presented), Some(stored)) => verify_client_secret(presented, stored),
                _ => false,
            };
            if !verified {
                warn!(client_id = %client_id, "Client secret mismatch");
                return Err(ClientAuthError::BadSecret);
            }
        }

        Ok(client)
    }

    /// Checks that the redirect URI is registered for the client.
    ///
    /// # Errors
    ///
    /// Returns `RedirectMismatch` unless the URI matches a registered one exactly.
    pub fn validate_redirect(client: &Client, redirect_uri: &str) -> Result<(), ClientAuthError> {
        if client.is_redirect_uri_allowed(redirect_uri) {
            Ok(())
        } else {
            warn!(client_id = %client.client_id, redirect_uri = %redirect_uri, "Redirect URI mismatch");
            Err(ClientAuthError::RedirectMismatch(redirect_uri.to_string()))
        }
    }

    /// Checks that the client may use the grant type.
    ///
    /// # Errors
    ///
    /// Returns `GrantNotAllowed`.
    pub fn check_grant(client: &Client, grant: GrantType) -> Result<(), ClientAuthError> {
        if client.is_grant_type_allowed(grant) {
            Ok(())
        } else {
            Err(ClientAuthError::GrantNotAllowed(grant))
        }
    }
}

/// Parses an HTTP Basic `Authorization` header into (client_id, secret).
///
/// Returns `None` for other schemes or undecodable values.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResult;
    use crate::secret::hash_client_secret;
    use crate::types::ClientType;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Mock client storage for testing.
    struct MockClientStorage {
        clients: RwLock<HashMap<String, Client>>,
    }

    impl MockClientStorage {
        fn new() -> Self {
            Self {
                clients: RwLock::new(HashMap::new()),
            }
        }

        fn add_client(&self, client: Client) {
            self.clients
                .write()
                .unwrap()
                .insert(client.client_id.clone(), client);
        }
    }

    #[async_trait]
    impl ClientStorage for MockClientStorage {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.clients.read().unwrap().get(client_id).cloned())
        }

        async fn create(&self, client: &Client) -> AuthResult<Client> {
            self.add_client(client.clone());
            Ok(client.clone())
        }
    }

    fn validator() -> (ClientValidator, Arc<MockClientStorage>) {
        let storage = Arc::new(MockClientStorage::new());
        storage.add_client(Client::public("demo", vec!["http://x/cb".to_string()]));

        let mut web = Client::public("web", vec!["https://app.example.com/cb".to_string()]);
        web.client_type = ClientType::Confidential;
        web.client_secret = Some(hash_client_secret("s3cret").unwrap());
        web.grant_types = vec![GrantType::AuthorizationCode];
        storage.add_client(web);

        (ClientValidator::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_confidential_client_requires_secret() {
        let (validator, _) = validator();

        assert!(validator.authenticate("web", Some("s3cret")).await.is_ok());
        assert!(matches!(
            validator.authenticate("web", Some("wrong")).await,
            Err(ClientAuthError::BadSecret)
        ));
        assert!(matches!(
            validator.authenticate("web", None).await,
            Err(ClientAuthError::BadSecret)
        ));
    }

    #[tokio::test]
    async fn test_public_client_ignores_secret() {
        let (validator, _) = validator();
        assert!(validator.authenticate("demo", None).await.is_ok());
        assert!(validator.authenticate("demo", Some("anything")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let (validator, _) = validator();
        let err = validator.authenticate("nope", None).await.unwrap_err();
        assert!(matches!(err, ClientAuthError::UnknownClient(_)));
        assert_eq!(AuthError::from(err).oauth_error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn test_authorize_request_checks_redirect() {
        let (validator, _) = validator();
        assert!(validator.authorize_request("demo", "http://x/cb").await.is_ok());

        let err = validator
            .authorize_request("demo", "http://x/cb/evil")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientAuthError::RedirectMismatch(_)));
    }

    #[tokio::test]
    async fn test_dynamic_clients_are_opt_in() {
        let (validator, storage) = validator();
        assert!(matches!(
            validator.authorize_request("new-app", "http://new/cb").await,
            Err(ClientAuthError::UnknownClient(_))
        ));
        assert!(storage.clients.read().unwrap().get("new-app").is_none());

        let validator = validator.with_dynamic_clients(true);
        let client = validator
            .authorize_request("new-app", "http://new/cb")
            .await
            .unwrap();
        assert!(!client.is_confidential());
        assert!(storage.clients.read().unwrap().contains_key("new-app"));

        // the registered redirect URI is now binding
        assert!(matches!(
            validator.authorize_request("new-app", "http://other/cb").await,
            Err(ClientAuthError::RedirectMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_grant_restriction() {
        let (validator, _) = validator();
        let web = validator.lookup("web").await.unwrap();
        assert!(ClientValidator::check_grant(&web, GrantType::AuthorizationCode).is_ok());

        let err = ClientValidator::check_grant(&web, GrantType::RefreshToken).unwrap_err();
        assert_eq!(AuthError::from(err).oauth_error_code(), "unauthorized_client");
    }

    #[test]
    fn test_parse_basic_auth() {
        // "client:sec:ret"
        assert_eq!(
            parse_basic_auth("Basic Y2xpZW50OnNlYzpyZXQ="),
            Some(("client".to_string(), "sec:ret".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer abc"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
        // "nocolon"
        assert_eq!(parse_basic_auth("Basic bm9jb2xvbg=="), None);
    }

    #[test]
    fn test_credentials_prefer_header() {
        let creds = ClientCredentials::from_request(
            Some("Basic Y2xpZW50OnNlYzpyZXQ="),
            Some("body-client"),
            Some("body-secret"),
        )
        .unwrap();
        assert_eq!(creds.client_id, "client");
        assert_eq!(creds.client_secret.as_deref(), Some("sec:ret"));

        let creds = ClientCredentials::from_request(None, Some("demo"), Some("")).unwrap();
        assert_eq!(creds.client_id, "demo");
        assert!(creds.client_secret.is_none());

        assert!(ClientCredentials::from_request(None, None, None).is_none());
        assert!(ClientCredentials::from_request(None, Some(""), None).is_none());
    }
}
