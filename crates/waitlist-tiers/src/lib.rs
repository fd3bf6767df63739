//! # waitlist-tiers
//!
//! Price tier derivation.
//!
//! A queue position maps to exactly one priced band. Spots earned from
//! referrals and shares may improve the displayed tier, but never by more
//! than one band from the tier assigned at signup.
//!
//! ## Modules
//!
//! - [`schedule`]: Band table and the position → (tier, price) function
//! - [`advance`]: One-tier-capped effective tier

pub mod advance;
pub mod schedule;

use waitlist_types::TierNumber;

/// Error types for tier operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// Positions are non-negative.
    #[error("position must be non-negative, got {0}")]
    NegativePosition(i64),

    /// The schedule has no bands.
    #[error("tier schedule is empty")]
    EmptySchedule,

    /// Band bounds must strictly increase.
    #[error("band {tier} upper bound {bound} does not exceed previous bound {previous}")]
    BoundsNotAscending {
        /// Offending tier.
        tier: TierNumber,
        /// Its upper bound.
        bound: u64,
        /// The previous band's upper bound.
        previous: u64,
    },

    /// Only the last band may be unbounded, and it must be.
    #[error("only the last band may be unbounded (tier {0})")]
    MisplacedUnboundedBand(TierNumber),

    /// Prices must not decrease as tiers rise.
    #[error("tier {tier} price {price} is cheaper than tier {previous_tier}")]
    PriceNotMonotonic {
        /// Offending tier.
        tier: TierNumber,
        /// Its price.
        price: u64,
        /// The cheaper-expected tier before it.
        previous_tier: TierNumber,
    },

    /// Tier number outside the schedule.
    #[error("unknown tier {0}")]
    UnknownTier(TierNumber),
}

/// Convenience result type for tier operations.
pub type Result<T> = std::result::Result<T, TierError>;
