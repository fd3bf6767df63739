//! Status transitions and read models.

use rusqlite::TransactionBehavior;
use tracing::info;
use waitlist_db::queries::{entrants, referrals, sequence, shares};
use waitlist_db::DbError;
use waitlist_types::entrant::{Entrant, EntrantStatus, EntrantView};
use waitlist_types::events::{EntrantStatusChanged, WaitlistEvent};
use waitlist_types::tier::CounterSnapshot;

use crate::{Result, Waitlist, WaitlistError};

/// Largest page returned by [`Waitlist::list_queue`].
pub const MAX_PAGE: u32 = 500;

impl Waitlist {
    /// `pending → active`.
    pub async fn activate(&self, entrant_id: &str) -> Result<EntrantStatus> {
        self.transition(entrant_id, EntrantStatus::Active).await
    }

    /// `pending → suspended` or `active → suspended`.
    pub async fn suspend(&self, entrant_id: &str) -> Result<EntrantStatus> {
        self.transition(entrant_id, EntrantStatus::Suspended).await
    }

    async fn transition(&self, entrant_id: &str, to: EntrantStatus) -> Result<EntrantStatus> {
        let from = {
            let mut db = self.db.lock().await;
            let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let from = entrants::get(&tx, entrant_id)?.status;
            if !from.can_transition_to(to) {
                return Err(WaitlistError::InvalidTransition { from, to });
            }
            if !entrants::update_status(&tx, entrant_id, from, to)? {
                return Err(WaitlistError::Storage(DbError::NoRowsWritten(format!(
                    "status of entrant {entrant_id}"
                ))));
            }
            tx.commit()?;
            from
        };

        info!(entrant_id, %from, %to, "entrant status changed");
        self.emit(WaitlistEvent::EntrantStatusChanged(EntrantStatusChanged {
            entrant_id: entrant_id.to_string(),
            old_status: from,
            new_status: to,
        }));
        Ok(to)
    }

    /// Full read model for one entrant.
    pub async fn entrant_status(&self, entrant_id: &str) -> Result<EntrantView> {
        let db = self.db.lock().await;
        let entrant = entrants::get(&db, entrant_id)?;
        let progress = referrals::progress(&db, entrant_id)?;
        let verified_platforms = shares::list_for_user(&db, entrant_id)?
            .into_iter()
            .filter(|share| share.verified)
            .map(|share| share.platform)
            .collect();

        Ok(EntrantView {
            entrant_id: entrant.id,
            position: entrant.position,
            tier_at_signup: entrant.tier_at_signup,
            price_at_signup: entrant.price_at_signup,
            tier_current: entrant.tier_current,
            price_current: entrant.price_current,
            spots_awarded: entrant.spots_awarded,
            referral_code: entrant.referral_code,
            status: entrant.status,
            referrals: progress,
            verified_platforms,
        })
    }

    /// Counter widget state. Read-only.
    pub async fn counter_snapshot(&self) -> Result<CounterSnapshot> {
        let total = {
            let db = self.db.lock().await;
            entrants::max_position(&db)?
        };
        Ok(self.schedule.snapshot(total))
    }

    /// Entrants in position order. `limit` is capped at [`MAX_PAGE`].
    pub async fn list_queue(&self, offset: u64, limit: u32) -> Result<Vec<Entrant>> {
        let db = self.db.lock().await;
        Ok(entrants::list(&db, offset, limit.min(MAX_PAGE))?)
    }

    /// Positions handed out versus entrants stored. Equal unless a
    /// standalone allocation was made without an entrant.
    pub async fn queue_depth(&self) -> Result<(u64, u64)> {
        let db = self.db.lock().await;
        Ok((sequence::last_position(&db)?, entrants::count(&db)?))
    }
}
