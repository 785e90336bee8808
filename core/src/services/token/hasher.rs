//! Raw refresh tokens are only ever stored and compared through this hash.

use sha2::{Digest, Sha256};

/// SHA-256 of the raw token, lowercase hex
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
