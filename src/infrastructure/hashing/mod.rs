//! Content addressing for module files

use sha2::{Digest, Sha256};

/// SHA-256 of `content` as lowercase hex
pub fn digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// First 12 hex chars of a digest, for listings
pub fn short_digest(digest: &str) -> &str {
    &digest[..digest.len().min(12)]
}
