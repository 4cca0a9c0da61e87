use sha2::{Digest, Sha256};

/// Hex-encoded sha256 of a payload.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable publish key for a (name, payload) pair, used to spot republished
/// content.
pub fn compute_publish_key(name: &str, payload_sha256_hex: &str) -> String {
    // Simple canonical string; can be evolved later
    let mut s = String::new();
    s.push_str(name);
    s.push('|');
    s.push_str(payload_sha256_hex);

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
