//! JWT token generation and validation.
//!
//! Access, refresh and ID tokens are all JWTs signed with the same key. Each
//! carries a `type` claim (`"access"`, `"refresh"` or `"id"`), and the claim
//! sets are modelled as one internally tagged enum, [`TokenClaims`], so a
//! refresh token can never be decoded as an access token or vice versa.
//!
//! ## Supported Algorithms
//!
//! - **HS256**: HMAC with a shared secret (default)
//! - **RS256**: RSA with SHA-256, keys loaded from PEM files
//!
//! ## Example
//!
//! ```
//! use idbridge_auth::token::jwt::{JwtService, SigningKey, TokenKind};
//!
//! let service = JwtService::new(SigningKey::hmac(b"secret"), "https://id.example.com", "api");
//! let refresh = service.issue_refresh("user-1").unwrap();
//!
//! let claims = service.verify(&refresh.value, TokenKind::Refresh).unwrap();
//! assert_eq!(claims.subject(), "user-1");
//! assert!(service.verify(&refresh.value, TokenKind::Access).is_err());
//! ```

use std::fmt;
use std::path::Path;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::config::{OAuthConfig, SigningConfig};
use crate::random::random_string;
use crate::types::User;

/// Length of the random `jti` claim.
const JTI_LENGTH: usize = 16;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// The token is not a well-formed JWT or its claims do not parse.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the parse error.
        message: String,
    },

    /// The token signature does not verify under the service key, or the
    /// token was issued by someone else.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token is valid but of another kind than expected.
    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongTokenType {
        /// Kind the caller asked for.
        expected: TokenKind,
        /// Kind the token actually is.
        actual: TokenKind,
    },

    /// Signing key material is unusable.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if the token itself was rejected (as opposed to a key
    /// or encoding problem on our side).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::SignatureInvalid
                | Self::Expired
                | Self::WrongTokenType { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer => Self::SignatureInvalid,
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// RSA with SHA-256.
    RS256,
}

impl SigningAlgorithm {
    /// Parses the configured algorithm name.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` for anything but "HS256" or "RS256".
    pub fn parse(value: &str) -> Result<Self, JwtError> {
        match value {
            "HS256" => Ok(Self::HS256),
            "RS256" => Ok(Self::RS256),
            other => Err(JwtError::invalid_key(format!(
                "unsupported signing algorithm: {other}"
            ))),
        }
    }

    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::RS256 => Algorithm::RS256,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::RS256 => "RS256",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key material for signing and verifying tokens.
pub struct SigningKey {
    algorithm: SigningAlgorithm,
    kid: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Creates an HS256 key from a shared secret.
    #[must_use]
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            algorithm: SigningAlgorithm::HS256,
            kid: None,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Creates an RS256 key from PEM text.
    ///
    /// The private key may be PKCS#8 or PKCS#1. When no public key is given
    /// it is derived from the private key.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` if either PEM does not parse.
    pub fn rsa_from_pem(private_pem: &str, public_pem: Option<&str>) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_pem = match public_pem {
            Some(pem) => pem.to_string(),
            None => {
                let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
                    .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_pem))
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?;
                private_key
                    .to_public_key()
                    .to_public_key_pem(LineEnding::LF)
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?
            }
        };

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            algorithm: SigningAlgorithm::RS256,
            kid: None,
            encoding_key,
            decoding_key,
        })
    }

    /// Builds the key described by the signing configuration, reading PEM
    /// files from disk for RS256.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` if the algorithm is unsupported or a
    /// key file cannot be read or parsed.
    pub fn from_config(config: &SigningConfig) -> Result<Self, JwtError> {
        let key = match SigningAlgorithm::parse(&config.algorithm)? {
            SigningAlgorithm::HS256 => Self::hmac(config.secret.as_bytes()),
            SigningAlgorithm::RS256 => {
                let private_path = config
                    .private_key_path
                    .as_deref()
                    .ok_or_else(|| JwtError::invalid_key("RS256 requires private_key_path"))?;
                let private_pem = read_pem(private_path)?;
                let public_pem = config.public_key_path.as_deref().map(read_pem).transpose()?;
                Self::rsa_from_pem(&private_pem, public_pem.as_deref())?
            }
        };

        Ok(match &config.key_id {
            Some(kid) => key.with_kid(kid.clone()),
            None => key,
        })
    }

    /// Sets the key id placed in token headers.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

fn read_pem(path: impl AsRef<Path>) -> Result<String, JwtError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map_err(|e| JwtError::invalid_key(format!("failed to read {}: {e}", path.display())))
}

// ============================================================================
// Token Claims
// ============================================================================

/// The three kinds of token the service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer token for resource access.
    Access,
    /// Long-lived token for obtaining new access tokens.
    Refresh,
    /// OpenID Connect identity assertion.
    Id,
}

impl TokenKind {
    /// Returns the value of the `type` claim.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::Id => "id",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (local user id).
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// JWT ID.
    pub jti: String,
    /// User email.
    #[serde(default)]
    pub email: String,
    /// User display name.
    #[serde(default)]
    pub name: String,
    /// Space-separated scopes.
    #[serde(default)]
    pub scope: String,
    /// OAuth client the token was issued to.
    pub client_id: String,
}

/// Refresh token claims. Kept minimal on purpose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (local user id).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// JWT ID. Also makes two refresh tokens minted in the same second differ.
    pub jti: String,
}

/// OpenID Connect ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (local user id).
    pub sub: String,
    /// Audience (the client id).
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// User email.
    #[serde(default)]
    pub email: String,
    /// Whether the email is verified.
    #[serde(default)]
    pub email_verified: bool,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Profile picture URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Claims of any token the service issues, tagged by the `type` claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenClaims {
    /// Access token.
    Access(AccessClaims),
    /// Refresh token.
    Refresh(RefreshClaims),
    /// ID token.
    Id(IdClaims),
}

impl TokenClaims {
    /// Returns the token kind.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Access(_) => TokenKind::Access,
            Self::Refresh(_) => TokenKind::Refresh,
            Self::Id(_) => TokenKind::Id,
        }
    }

    /// Returns the `sub` claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::Access(c) => &c.sub,
            Self::Refresh(c) => &c.sub,
            Self::Id(c) => &c.sub,
        }
    }

    /// Returns the `exp` claim.
    #[must_use]
    pub fn exp(&self) -> i64 {
        match self {
            Self::Access(c) => c.exp,
            Self::Refresh(c) => c.exp,
            Self::Id(c) => c.exp,
        }
    }

    /// Returns the `exp` claim as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Compact JWT serialization.
    pub value: String,
    /// Value of the `exp` claim.
    pub expires_at: OffsetDateTime,
}

// ============================================================================
// JWT Service
// ============================================================================

/// Token lifetimes used by [`JwtService`].
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    /// Access token lifetime.
    pub access: Duration,
    /// Refresh token lifetime.
    pub refresh: Duration,
    /// ID token lifetime.
    pub id: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::days(30),
            id: Duration::hours(1),
        }
    }
}

impl From<&OAuthConfig> for TokenLifetimes {
    fn from(config: &OAuthConfig) -> Self {
        let convert = |d: std::time::Duration| Duration::try_from(d).unwrap_or(Duration::MAX);
        Self {
            access: convert(config.access_token_lifetime),
            refresh: convert(config.refresh_token_lifetime),
            id: convert(config.id_token_lifetime),
        }
    }
}

/// Service for issuing and verifying tokens.
///
/// This service is thread-safe (`Send + Sync`) and can be shared across
/// async tasks.
pub struct JwtService {
    key: SigningKey,
    issuer: String,
    audience: String,
    lifetimes: TokenLifetimes,
}

impl JwtService {
    /// Creates a new JWT service with default lifetimes
    /// (access 1h, refresh 30d, ID 1h).
    #[must_use]
    pub fn new(key: SigningKey, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
            audience: audience.into(),
            lifetimes: TokenLifetimes::default(),
        }
    }

    /// Overrides token lifetimes.
    #[must_use]
    pub fn with_lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the configured lifetimes.
    #[must_use]
    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Issues an access token for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue_access(
        &self,
        user: &User,
        client_id: &str,
        scope: &str,
    ) -> Result<SignedToken, JwtError> {
        let (iat, exp) = self.window(self.lifetimes.access);
        self.sign(&TokenClaims::Access(AccessClaims {
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            aud: self.audience.clone(),
            exp,
            iat,
            jti: random_string(JTI_LENGTH),
            email: user.email.clone(),
            name: user.name.clone(),
            scope: scope.to_string(),
            client_id: client_id.to_string(),
        }))
    }

    /// Issues a refresh token carrying only the subject and a unique id.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue_refresh(&self, subject: &str) -> Result<SignedToken, JwtError> {
        let (iat, exp) = self.window(self.lifetimes.refresh);
        self.sign(&TokenClaims::Refresh(RefreshClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            exp,
            iat,
            jti: random_string(JTI_LENGTH),
        }))
    }

    /// Issues an ID token presenting the user's profile to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue_id(&self, user: &User, client_id: &str) -> Result<SignedToken, JwtError> {
        let (iat, exp) = self.window(self.lifetimes.id);
        self.sign(&TokenClaims::Id(IdClaims {
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            aud: client_id.to_string(),
            exp,
            iat,
            email: user.email.clone(),
            email_verified: user.email_verified,
            name: user.name.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            picture: user.picture.clone(),
        }))
    }

    /// Verifies signature, issuer, expiry and kind of a token.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid` if the signature or issuer does not match
    /// - `Expired` if `exp` has passed
    /// - `WrongTokenType` if the token is of another kind
    /// - `Malformed` if the token does not parse
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.validate_aud = false; // ID tokens are addressed to the client

        let data = decode::<TokenClaims>(token, &self.key.decoding_key, &validation)?;
        let actual = data.claims.kind();
        if actual != expected {
            return Err(JwtError::WrongTokenType { expected, actual });
        }
        Ok(data.claims)
    }

    fn window(&self, lifetime: Duration) -> (i64, i64) {
        let now = OffsetDateTime::now_utc();
        (now.unix_timestamp(), (now + lifetime).unix_timestamp())
    }

    fn sign(&self, claims: &TokenClaims) -> Result<SignedToken, JwtError> {
        let mut header = Header::new(self.key.algorithm.to_jwt_algorithm());
        header.kid = self.key.kid.clone();

        let value = encode(&header, claims, &self.key.encoding_key)
            .map_err(|e| JwtError::encoding(e.to_string()))?;
        Ok(SignedToken {
            value,
            expires_at: claims.expires_at(),
        })
    }
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("key", &self.key)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetimes", &self.lifetimes)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
