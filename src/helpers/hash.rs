use sha2::{Digest, Sha256};

/// Hash of the exact text an extraction ran over.
///
/// Offsets in `HelperRecord::source_range` are only meaningful against the
/// same bytes, so no whitespace normalization happens here.
pub fn content_hash(source: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.finalize().into()
}

/// First eight bytes of a hash in hex, for log lines.
pub fn short_hex(hash: &[u8; 32]) -> String {
    hash[..8].iter().map(|b| format!("{b:02x}")).collect()
}
