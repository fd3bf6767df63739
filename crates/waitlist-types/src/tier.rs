//! Tier and counter structures.

use serde::{Deserialize, Serialize};

use crate::{Position, PriceCents, TierNumber};

/// A (tier, price) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TierQuote {
    pub tier: TierNumber,
    pub price_cents: PriceCents,
}

/// Aggregate shown by the public counter widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CounterSnapshot {
    /// Tier the next signup would land in.
    pub tier: TierNumber,
    pub price_cents: PriceCents,
    /// Signups left before the next tier opens. `None` in the unbounded tier.
    pub spots_remaining_in_tier: Option<u64>,
    pub total_signups: Position,
}
