//! Shared SHA-256 hex digest utility.
//!
//! Used for batch fingerprints (generation cache keys) and preview cache keys.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compute a SHA-256 hex digest over several parts.
///
/// Each part is followed by a `0x1f` unit separator so that
/// `["ab", "c"]` and `["a", "bc"]` hash differently.
pub fn sha256_hex_parts<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
