// Logical key to on-disk filename mapping.

use sha2::{Digest, Sha256};

/// Length in hex characters of a hashed key (128 bits).
pub const HASHED_KEY_LEN: usize = 32;

/// Hash a logical key into a fixed-length, filesystem-safe filename.
///
/// SHA-256 truncated to 128 bits, rendered as lowercase hex. Any input is
/// accepted, including the empty string.
pub fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..HASHED_KEY_LEN / 2])
}
