//! # waitlist-crypto
//!
//! Identifier derivation for the waitlist.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing
//! - [`codes`]: Referral codes, entrant ids and source fingerprints

pub mod blake3;
pub mod codes;
