//! Domain-separated BLAKE3 hashing.
//!
//! Every derived identifier uses BLAKE3's key derivation mode with one of the
//! registered context strings, so an entrant id can never equal a referral
//! code suffix or a fingerprint computed from the same input.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const REFERRAL_CODE: &str = "Waitlist v1 referral-code";
    pub const ENTRANT_ID: &str = "Waitlist v1 entrant-id";
    pub const IP_FINGERPRINT: &str = "Waitlist v1 ip-fingerprint";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[REFERRAL_CODE, ENTRANT_ID, IP_FINGERPRINT];
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// `context` should be one of [`contexts::ALL_CONTEXTS`].
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
