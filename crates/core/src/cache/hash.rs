//! Request identity keys for cache entries.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request: SHA-256 over the uppercased method
/// and the absolute URL.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
