//! Random identifiers, salts, and CouchDB password hashes.
//!
//! Credentials are generated per session, so the clear-text password only
//! ever lives in memory; the session file carries the salted hash.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Dbase32 alphabet: sorted, and free of the easily confused `0`, `1`, `2`,
/// and `Z`.
const DB32_ALPHABET: &[u8; 32] = b"3456789ABCDEFGHIJKLMNOPQRSTUVWXY";

/// Bytes of entropy in an identifier returned by [`random_id`].
pub const RANDOM_ID_BYTES: usize = 15;

/// Bytes of entropy in a salt returned by [`random_salt`].
pub const SALT_BYTES: usize = 16;

/// Length of the hex-encoded salt accepted by [`couch_hashed`].
pub const SALT_LEN: usize = SALT_BYTES * 2;

/// Errors raised while encoding or hashing credential material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Dbase32 input must be a non-empty multiple of 5 bytes.
    #[error("dbase32 input must be a non-empty multiple of 5 bytes; got {len}")]
    Db32Length {
        /// Length of the rejected input.
        len: usize,
    },
    /// Salts must be exactly [`SALT_LEN`] characters.
    #[error("salt must be 32 characters; got {len}")]
    SaltLength {
        /// Length of the rejected salt.
        len: usize,
    },
}

/// Encodes `data` with the Dbase32 alphabet.
///
/// Every 5-byte group becomes 8 characters, most significant bits first.
#[expect(
    clippy::cast_possible_truncation,
    clippy::indexing_slicing,
    reason = "each index is masked to 5 bits and addresses a 32-entry alphabet"
)]
pub fn db32_encode(data: &[u8]) -> Result<String, CredentialError> {
    if data.is_empty() || data.len() % 5 != 0 {
        return Err(CredentialError::Db32Length { len: data.len() });
    }
    let mut encoded = String::with_capacity(data.len() / 5 * 8);
    for group in data.chunks_exact(5) {
        let taxi = group
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        for shift in (0..8u32).rev() {
            let index = ((taxi >> (shift * 5)) & 0x1f) as usize;
            encoded.push(char::from(DB32_ALPHABET[index]));
        }
    }
    Ok(encoded)
}

/// Returns a 120-bit random identifier as 24 Dbase32 characters.
#[must_use]
pub fn random_id() -> String {
    let mut bytes = [0u8; RANDOM_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    // RANDOM_ID_BYTES is a multiple of 5.
    db32_encode(&bytes).unwrap_or_default()
}

/// Returns a 128-bit random salt, hex encoded.
#[must_use]
pub fn random_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hashes `password` with `salt` the way CouchDB's `[admins]` section expects.
///
/// ```text
/// couch_hashed("secret", "da52c844db4b8bd88ebb96d72542457a")
///   == "-hashed-ddf425840fd7f81cc45d9e9f5aa484d1f60964a9,da52c844db4b8bd88ebb96d72542457a"
/// ```
pub fn couch_hashed(password: &str, salt: &str) -> Result<String, CredentialError> {
    if salt.len() != SALT_LEN {
        return Err(CredentialError::SaltLength { len: salt.len() });
    }
    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    let digest = hex::encode(hasher.finalize());
    Ok(format!("-hashed-{digest},{salt}"))
}

/// OAuth 1.0a token set granted to the session admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Consumer key.
    pub consumer_key: String,
    /// Consumer secret.
    pub consumer_secret: String,
    /// Access token.
    pub token: String,
    /// Access token secret.
    pub token_secret: String,
}

impl OAuthTokens {
    /// Generates a fresh token set from [`random_id`].
    #[must_use]
    pub fn random() -> Self {
        Self {
            consumer_key: random_id(),
            consumer_secret: random_id(),
            token: random_id(),
            token_secret: random_id(),
        }
    }
}
