//! # waitlist-types
//!
//! Shared domain types used across the waitlist workspace.
//! Outbound structures derive `ts_rs::TS` so the web frontend can consume
//! them without hand-maintained bindings.

pub mod entrant;
pub mod events;
pub mod referral;
pub mod share;
pub mod tier;

/// Opaque entrant identifier (32 lowercase hex characters).
pub type EntrantId = String;

/// Activation-queue rank. Starts at 1.
pub type Position = u64;

/// Tier number. Lower is cheaper.
pub type TierNumber = u32;

/// Price in the smallest currency unit (cents).
pub type PriceCents = u64;

/// Referral batch identifier.
pub type BatchId = i64;

/// Number of verified referrals that make up one batch.
pub const DEFAULT_BATCH_SIZE: u32 = 3;

/// Spots awarded for each completed referral batch.
pub const DEFAULT_SPOTS_PER_BATCH: u64 = 10;

/// Spots awarded for each verified social share.
pub const DEFAULT_SPOTS_PER_SHARE: u64 = 5;

/// Maximum length of a normalized email address.
pub const MAX_EMAIL_LEN: usize = 254;

/// Normalize an email address for identity comparison.
///
/// Emails are case-insensitive keys; surrounding whitespace is dropped.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Minimal structural email check: one `@`, non-empty local part, a dot in
/// the domain, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
