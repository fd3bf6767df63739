//! Effective tier after earned spots.
//!
//! Earned spots are subtracted from the position before the band lookup,
//! then the result is clamped so it is at most one tier better than the tier
//! assigned at signup and never worse than it. The price always follows the
//! clamped tier.

use waitlist_types::tier::TierQuote;
use waitlist_types::{Position, TierNumber};

use crate::schedule::TierSchedule;
use crate::Result;

/// Compute the displayed tier for an entrant.
///
/// Deterministic in its inputs; callers recompute from the full spot total
/// rather than applying deltas.
///
/// # Errors
///
/// - [`TierError::UnknownTier`](crate::TierError::UnknownTier) if
///   `tier_at_signup` is not in the schedule
pub fn advanced_tier(
    schedule: &TierSchedule,
    position: Position,
    tier_at_signup: TierNumber,
    spots_awarded: u64,
) -> Result<TierQuote> {
    // Validates tier_at_signup.
    schedule.price_of(tier_at_signup)?;

    let effective_position = position.saturating_sub(spots_awarded);
    let candidate = schedule.quote(effective_position).tier;
    let floor = tier_at_signup.saturating_sub(1).max(1);
    let tier = candidate.clamp(floor, tier_at_signup);

    tracing::trace!(
        position,
        spots_awarded,
        effective_position,
        candidate,
        tier,
        "advanced tier"
    );

    Ok(TierQuote {
        tier,
        price_cents: schedule.price_of(tier)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TierError;

    fn schedule() -> TierSchedule {
        TierSchedule::reference()
    }

    #[test]
    fn test_no_spots_keeps_signup_tier() {
        let quote = advanced_tier(&schedule(), 150, 2, 0).expect("quote");
        assert_eq!(quote, TierQuote { tier: 2, price_cents: 2400 });
    }

    #[test]
    fn test_advances_one_tier() {
        // 150 - 50 = 100 lands in tier 1.
        let quote = advanced_tier(&schedule(), 150, 2, 50).expect("quote");
        assert_eq!(quote, TierQuote { tier: 1, price_cents: 1900 });
    }

    #[test]
    fn test_not_enough_spots() {
        // 150 - 30 = 120 is still tier 2.
        let quote = advanced_tier(&schedule(), 150, 2, 30).expect("quote");
        assert_eq!(quote.tier, 2);
    }

    #[test]
    fn test_capped_at_one_tier() {
        let quote = advanced_tier(&schedule(), 450, 5, 10_000).expect("quote");
        assert_eq!(quote, TierQuote { tier: 4, price_cents: 3400 });
    }

    #[test]
    fn test_best_tier_unchanged() {
        let quote = advanced_tier(&schedule(), 40, 1, 1_000).expect("quote");
        assert_eq!(quote, TierQuote { tier: 1, price_cents: 1900 });
    }

    #[test]
    fn test_never_worse_than_signup_tier() {
        // Signup tier recorded better than the raw band for the position.
        let quote = advanced_tier(&schedule(), 350, 3, 0).expect("quote");
        assert_eq!(quote.tier, 3);
    }

    #[test]
    fn test_price_follows_final_tier() {
        let schedule = schedule();
        for spots in [0, 10, 100, 1_000] {
            let quote = advanced_tier(&schedule, 250, 3, spots).expect("quote");
            assert_eq!(quote.price_cents, schedule.price_of(quote.tier).expect("price"));
        }
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let a = advanced_tier(&schedule(), 333, 4, 40).expect("a");
        let b = advanced_tier(&schedule(), 333, 4, 40).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_signup_tier() {
        assert_eq!(
            advanced_tier(&schedule(), 10, 9, 0),
            Err(TierError::UnknownTier(9))
        );
    }
}
