//! SHA-256 helpers shared by block hashing and certificate payload hashing.

use sha2::{Digest, Sha256};

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// SHA-256 hex of a single byte string. Used to derive the data/image
/// hashes a certificate commits to when the caller submits raw content.
pub fn sha256_hex(data: &[u8]) -> String {
    hash_concat(&[data])
}
