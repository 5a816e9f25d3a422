//! Client secret generation and verification.
//!
//! Confidential client secrets are stored as Argon2id PHC strings and never
//! in the clear.
//!
//! # Example
//!
//! ```
//! use idbridge_auth::secret::{generate_client_secret, hash_client_secret, verify_client_secret};
//!
//! let secret = generate_client_secret();
//! let hash = hash_client_secret(&secret).unwrap();
//!
//! assert!(verify_client_secret(&secret, &hash));
//! assert!(!verify_client_secret("wrong", &hash));
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

/// Generates a random 256-bit client secret, hex encoded.
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Hashes a client secret for storage using Argon2id with a random salt.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_client_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a client secret against a stored hash.
///
/// A stored value that is not a valid PHC string never verifies.
#[must_use]
pub fn verify_client_secret(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
