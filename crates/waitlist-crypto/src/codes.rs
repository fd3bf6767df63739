//! Referral codes, entrant ids and source fingerprints.
//!
//! A referral code is `<NAME>-<SUFFIX>`: the first word of the display name
//! (uppercased ASCII alphanumerics) followed by eight hex characters derived
//! from the normalized email and an attempt counter. Two entrants named
//! "Priya" therefore differ in the suffix, and a suffix collision is resolved
//! by retrying with the next attempt number.

use crate::blake3::{self, contexts};

/// Longest name prefix kept in a referral code.
pub const MAX_NAME_PREFIX: usize = 10;

/// Prefix used when the display name has no usable characters.
pub const FALLBACK_PREFIX: &str = "FRIEND";

/// Bytes of derived material rendered into the suffix (8 hex chars).
const SUFFIX_BYTES: usize = 4;

/// Upper-cased alphanumeric prefix taken from the first word of `display_name`.
pub fn name_prefix(display_name: &str) -> String {
    let prefix: String = display_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_NAME_PREFIX)
        .collect::<String>()
        .to_ascii_uppercase();
    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}

/// Derive the referral code for `attempt` (0 for the first try).
///
/// Deterministic: a replayed signup derives the same code for the same
/// attempt number.
pub fn referral_code(display_name: &str, normalized_email: &str, attempt: u32) -> String {
    let material =
        blake3::encode_multi_field(&[normalized_email.as_bytes(), &attempt.to_le_bytes()]);
    let digest = blake3::derive_key(contexts::REFERRAL_CODE, &material);
    format!(
        "{}-{}",
        name_prefix(display_name),
        hex::encode_upper(&digest[..SUFFIX_BYTES])
    )
}

/// Canonical form of a code typed or pasted by a user.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Generate a fresh opaque entrant id (32 lowercase hex chars).
///
/// Mixes the email with 16 random bytes so ids carry no recoverable identity.
pub fn entrant_id(normalized_email: &str) -> String {
    let mut salt = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
    let material = blake3::encode_multi_field(&[normalized_email.as_bytes(), &salt]);
    let digest = blake3::derive_key(contexts::ENTRANT_ID, &material);
    hex::encode(&digest[..16])
}

/// Fingerprint of a click source IP for fraud grouping.
pub fn ip_fingerprint(ip_address: &str) -> String {
    let digest = blake3::derive_key(contexts::IP_FINGERPRINT, ip_address.trim().as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefix() {
        assert_eq!(name_prefix("Priya Raman"), "PRIYA");
        assert_eq!(name_prefix("  o'neil  "), "ONEIL");
        assert_eq!(name_prefix("Bartholomew-Maximilian"), "BARTHOLOME");
        assert_eq!(name_prefix("李"), FALLBACK_PREFIX);
        assert_eq!(name_prefix(""), FALLBACK_PREFIX);
    }

    #[test]
    fn test_same_name_distinct_codes() {
        let a = referral_code("Priya", "priya@a.com", 0);
        let b = referral_code("Priya", "priya@b.com", 0);
        assert!(a.starts_with("PRIYA-"));
        assert!(b.starts_with("PRIYA-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_code_deterministic_per_attempt() {
        let first = referral_code("Sam", "sam@example.com", 0);
        assert_eq!(first, referral_code("Sam", "sam@example.com", 0));
        assert_ne!(first, referral_code("Sam", "sam@example.com", 1));
    }

    #[test]
    fn test_code_shape() {
        let code = referral_code("Sam", "sam@example.com", 0);
        let (prefix, suffix) = code.split_once('-').expect("dash");
        assert_eq!(prefix, "SAM");
        assert_eq!(suffix.len(), SUFFIX_BYTES * 2);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(normalize_code(&code.to_lowercase()), code);
    }

    #[test]
    fn test_entrant_ids_unique() {
        let a = entrant_id("same@example.com");
        let b = entrant_id("same@example.com");
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ip_fingerprint_stable() {
        assert_eq!(ip_fingerprint("203.0.113.9"), ip_fingerprint(" 203.0.113.9 "));
        assert_ne!(ip_fingerprint("203.0.113.9"), ip_fingerprint("203.0.113.10"));
    }
}
