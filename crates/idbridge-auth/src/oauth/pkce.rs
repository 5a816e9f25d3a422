//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! Validation happens in two places:
//!
//! - At the authorization step, [`validate_challenge`] rejects malformed
//!   challenges and unknown methods before a session is created.
//! - At code redemption, [`verify`] checks the verifier against the stored
//!   challenge. It returns a plain `bool`; malformed input simply fails.
//!
//! # Example
//!
//! ```
//! use idbridge_auth::oauth::pkce::{self, PkceChallengeMethod};
//!
//! let verifier = pkce::generate_verifier();
//! let challenge = pkce::s256_challenge(&verifier);
//!
//! let method = pkce::validate_challenge(&challenge, Some("S256")).unwrap();
//! assert_eq!(method, PkceChallengeMethod::S256);
//! assert!(pkce::verify(&verifier, &challenge, method));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Minimum length of a challenge or verifier.
pub const MIN_LENGTH: usize = 43;

/// Maximum length of a challenge or verifier.
pub const MAX_LENGTH: usize = 128;

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced while validating PKCE parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    /// Challenge length is outside 43-128 characters.
    #[error("Invalid challenge length: must be 43-128 characters, got {0}")]
    InvalidChallengeLength(usize),

    /// Challenge contains characters outside the base64url alphabet.
    #[error("Invalid challenge characters: must be base64url ([A-Za-z0-9-_])")]
    InvalidChallengeCharacters,

    /// Challenge method is neither "plain" nor "S256".
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// Verifier length is outside 43-128 characters.
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains characters outside the RFC 3986 unreserved set.
    #[error("Invalid verifier characters: must be unreserved ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,
}

impl PkceError {
    /// Returns `true` if this error concerns the challenge or its method.
    #[must_use]
    pub fn is_challenge_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidChallengeLength(_)
                | Self::InvalidChallengeCharacters
                | Self::UnsupportedMethod(_)
        )
    }
}

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE challenge transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// The challenge is the verifier itself. Also used when no method is sent.
    #[serde(rename = "plain")]
    Plain,
    /// `BASE64URL(SHA256(verifier))`.
    S256,
}

impl PkceChallengeMethod {
    /// Parses the `code_challenge_method` parameter.
    ///
    /// An absent or empty parameter means [`Plain`](Self::Plain).
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for any other value.
    pub fn from_param(method: Option<&str>) -> Result<Self, PkceError> {
        match method {
            None | Some("") | Some("plain") => Ok(Self::Plain),
            Some("S256") => Ok(Self::S256),
            Some(other) => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Returns the wire name of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Validation and Verification
// =============================================================================

/// Validates a challenge received at the authorization step.
///
/// # Errors
///
/// Returns an error if the challenge is not 43-128 base64url characters or
/// the method is unsupported.
pub fn validate_challenge(
    challenge: &str,
    method: Option<&str>,
) -> Result<PkceChallengeMethod, PkceError> {
    if !challenge
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PkceError::InvalidChallengeCharacters);
    }

    let method = PkceChallengeMethod::from_param(method)?;

    let len = challenge.len();
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&len) {
        return Err(PkceError::InvalidChallengeLength(len));
    }

    Ok(method)
}

/// Validates the shape of a code verifier.
///
/// # Errors
///
/// Returns an error if the verifier is not 43-128 unreserved characters.
pub fn validate_verifier(verifier: &str) -> Result<(), PkceError> {
    let len = verifier.len();
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&len) {
        return Err(PkceError::InvalidVerifierLength(len));
    }

    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(PkceError::InvalidVerifierCharacters);
    }

    Ok(())
}

/// Computes the S256 challenge for a verifier.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verifies a code verifier against a stored challenge.
///
/// Never fails: a malformed verifier or challenge yields `false`.
#[must_use]
pub fn verify(verifier: &str, challenge: &str, method: PkceChallengeMethod) -> bool {
    if challenge.is_empty() || validate_verifier(verifier).is_err() {
        return false;
    }

    match method {
        PkceChallengeMethod::Plain => verifier == challenge,
        PkceChallengeMethod::S256 => s256_challenge(verifier) == challenge,
    }
}

/// Generates a random 43-character verifier.
///
/// Used by clients and tests; the server never needs one.
#[must_use]
pub fn generate_verifier() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_test_vector() {
        assert_eq!(s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(verify(RFC_VERIFIER, RFC_CHALLENGE, PkceChallengeMethod::S256));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            PkceChallengeMethod::from_param(None).unwrap(),
            PkceChallengeMethod::Plain
        );
        assert_eq!(
            PkceChallengeMethod::from_param(Some("")).unwrap(),
            PkceChallengeMethod::Plain
        );
        assert_eq!(
            PkceChallengeMethod::from_param(Some("plain")).unwrap(),
            PkceChallengeMethod::Plain
        );
        assert_eq!(
            PkceChallengeMethod::from_param(Some("S256")).unwrap(),
            PkceChallengeMethod::S256
        );
        assert_eq!(
            PkceChallengeMethod::from_param(Some("s256")),
            Err(PkceError::UnsupportedMethod("s256".to_string()))
        );
    }

    #[test]
    fn test_validate_challenge() {
        assert_eq!(
            validate_challenge(RFC_CHALLENGE, Some("S256")).unwrap(),
            PkceChallengeMethod::S256
        );
        assert_eq!(
            validate_challenge(RFC_CHALLENGE, None).unwrap(),
            PkceChallengeMethod::Plain
        );

        let short = "a".repeat(42);
        assert_eq!(
            validate_challenge(&short, Some("S256")),
            Err(PkceError::InvalidChallengeLength(42))
        );

        let long = "a".repeat(129);
        assert_eq!(
            validate_challenge(&long, Some("S256")),
            Err(PkceError::InvalidChallengeLength(129))
        );

        // '.' and '~' are valid verifier characters but not base64url
        let dotted = format!("{}.", "a".repeat(50));
        assert_eq!(
            validate_challenge(&dotted, None),
            Err(PkceError::InvalidChallengeCharacters)
        );

        let err = validate_challenge(RFC_CHALLENGE, Some("S512")).unwrap_err();
        assert!(err.is_challenge_error());
    }

    #[test]
    fn test_validate_verifier() {
        assert!(validate_verifier(RFC_VERIFIER).is_ok());
        assert!(validate_verifier(&format!("{}.~", "a".repeat(41))).is_ok());
        assert_eq!(
            validate_verifier("short"),
            Err(PkceError::InvalidVerifierLength(5))
        );
        assert_eq!(
            validate_verifier(&format!("{}+", "a".repeat(50))),
            Err(PkceError::InvalidVerifierCharacters)
        );
    }

    #[test]
    fn test_verify_plain() {
        let verifier = "a".repeat(43);
        assert!(verify(&verifier, &verifier, PkceChallengeMethod::Plain));
        assert!(!verify(&verifier, &"b".repeat(43), PkceChallengeMethod::Plain));
    }

    #[test]
    fn test_verify_rejects_other_verifier() {
        let verifier = generate_verifier();
        let challenge = s256_challenge(&verifier);
        let other = generate_verifier();
        assert!(verify(&verifier, &challenge, PkceChallengeMethod::S256));
        assert!(!verify(&other, &challenge, PkceChallengeMethod::S256));
    }

    #[test]
    fn test_verify_never_panics_on_malformed_input() {
        assert!(!verify("", RFC_CHALLENGE, PkceChallengeMethod::S256));
        assert!(!verify(RFC_VERIFIER, "", PkceChallengeMethod::S256));
        assert!(!verify("short", "short", PkceChallengeMethod::Plain));
        assert!(!verify(&"é".repeat(43), RFC_CHALLENGE, PkceChallengeMethod::S256));
    }

    #[test]
    fn test_generate_verifier() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 43);
        assert!(validate_verifier(&verifier).is_ok());
        assert_ne!(verifier, generate_verifier());
    }
}
