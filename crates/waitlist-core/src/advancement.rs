//! Tier-advancement engine.
//!
//! Recomputes an entrant's displayed tier from the full spot total
//! (completed referral batches plus verified shares). The only write is
//! `spots_awarded`, `tier_current` and `price_current`; position and signup
//! tier never change.

use rusqlite::Connection;
use tracing::info;
use waitlist_db::queries::{entrants, referrals, shares};
use waitlist_tiers::advance::advanced_tier;
use waitlist_tiers::schedule::TierSchedule;
use waitlist_types::events::{TierChanged, WaitlistEvent};
use waitlist_types::tier::TierQuote;

use crate::{Result, Waitlist};

/// Outcome of one recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recomputed {
    pub previous: TierQuote,
    pub current: TierQuote,
    pub spots_awarded: u64,
}

impl Recomputed {
    pub fn changed(&self) -> bool {
        self.previous.tier != self.current.tier
    }
}

/// Recompute and persist inside the caller's transaction.
pub fn recompute_in(
    conn: &Connection,
    schedule: &TierSchedule,
    entrant_id: &str,
) -> Result<Recomputed> {
    let entrant = entrants::get(conn, entrant_id)?;
    let spots = referrals::batch_spots(conn, entrant_id)? + shares::share_spots(conn, entrant_id)?;
    let current = advanced_tier(schedule, entrant.position, entrant.tier_at_signup, spots)?;
    let previous = TierQuote {
        tier: entrant.tier_current,
        price_cents: entrant.price_current,
    };

    if spots != entrant.spots_awarded || current != previous {
        entrants::update_tier(conn, entrant_id, spots, current.tier, current.price_cents)?;
    }

    Ok(Recomputed {
        previous,
        current,
        spots_awarded: spots,
    })
}

impl Waitlist {
    /// Recompute an entrant's effective tier.
    ///
    /// Idempotent. Emits `TierChanged` when `tier_current` moves.
    pub async fn recompute(&self, entrant_id: &str) -> Result<TierQuote> {
        let _guard = self.locks.lock(entrant_id).await;
        self.recompute_held(entrant_id).await
    }

    /// Recompute while the caller already holds `entrant_id`'s lock.
    pub(crate) async fn recompute_held(&self, entrant_id: &str) -> Result<TierQuote> {
        let outcome = {
            let mut db = self.db.lock().await;
            let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let outcome = recompute_in(&tx, &self.schedule, entrant_id)?;
            tx.commit()?;
            outcome
        };

        if outcome.changed() {
            info!(
                entrant_id,
                old_tier = outcome.previous.tier,
                new_tier = outcome.current.tier,
                spots = outcome.spots_awarded,
                "tier changed"
            );
            self.emit(WaitlistEvent::TierChanged(TierChanged {
                entrant_id: entrant_id.to_string(),
                old_tier: outcome.previous.tier,
                new_tier: outcome.current.tier,
                new_price_cents: outcome.current.price_cents,
            }));
        }
        Ok(outcome.current)
    }
}
