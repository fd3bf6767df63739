//! Integration test crate for the waitlist.
//!
//! The library only carries the harness shared by the scenarios in
//! `tests/`: an in-memory waitlist wired to a notifier that records every
//! event.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p waitlist-integration-tests
//! ```

use std::sync::{Arc, Mutex};

use waitlist_core::{Notifier, Rewards, Waitlist};
use waitlist_tiers::schedule::TierSchedule;
use waitlist_types::entrant::SignupIdentity;
use waitlist_types::events::WaitlistEvent;

/// Simulated identity verification time.
pub const TEST_TIMESTAMP: u64 = 1_700_000_000;

/// Notifier that keeps every event in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<WaitlistEvent>>,
}

impl RecordingNotifier {
    /// Everything notified so far, oldest first.
    pub fn events(&self) -> Vec<WaitlistEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// `(old_tier, new_tier)` of every tier change for `entrant_id`.
    pub fn tier_changes(&self, entrant_id: &str) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                WaitlistEvent::TierChanged(change) if change.entrant_id == entrant_id => {
                    Some((change.old_tier, change.new_tier))
                }
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: WaitlistEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// A fresh in-memory waitlist on the reference schedule.
pub fn waitlist(rewards: Rewards) -> waitlist_core::Result<(Arc<Waitlist>, Arc<RecordingNotifier>)> {
    let conn = waitlist_db::open_memory()?;
    let notifier = Arc::new(RecordingNotifier::default());
    let waitlist = Waitlist::new(
        Arc::new(tokio::sync::Mutex::new(conn)),
        TierSchedule::reference(),
        rewards,
        notifier.clone(),
    );
    Ok((Arc::new(waitlist), notifier))
}

/// A verified identity.
pub fn identity(email: &str, display_name: &str) -> SignupIdentity {
    SignupIdentity {
        email: email.to_string(),
        display_name: display_name.to_string(),
        verified_at: TEST_TIMESTAMP,
    }
}

/// Take `count` positions without creating entrants, so the next signup
/// lands further down the queue.
pub async fn burn_positions(waitlist: &Waitlist, count: u64) -> waitlist_core::Result<()> {
    for _ in 0..count {
        waitlist.allocate().await?;
    }
    Ok(())
}
