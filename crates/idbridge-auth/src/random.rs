//! Random identifiers for codes, state values and ids.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Generates a URL-safe random string of exactly `length` characters.
///
/// Draws `length` random bytes and keeps the first `length` characters of
/// their base64url encoding, so the entropy is 6 bits per character.
#[must_use]
pub fn random_string(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.truncate(length);
    encoded
}
