//! # waitlist-core
//!
//! Admission, referral and tier-advancement logic for the waitlist.
//!
//! All state lives in the SQLite database behind one shared connection.
//! Every write runs in an `IMMEDIATE` transaction so that a check and the
//! write it guards commit together. Multi-step operations on one entrant
//! (complete a batch, then recompute the tier) additionally hold that
//! entrant's key in [`locks::KeyedLocks`].
//!
//! ## Modules
//!
//! - [`allocator`]: Position claims from the monotonic sequence
//! - [`orchestrator`]: Signup: dedupe, allocate, price, code, persist
//! - [`ledger`]: Referrals and batch completion
//! - [`shares`]: Social share recording and verification
//! - [`advancement`]: One-tier-capped tier recompute
//! - [`queue`]: Status transitions and read models
//! - [`locks`]: Per-entrant async critical sections
//! - [`notify`]: Outbound notification seam

pub mod advancement;
pub mod allocator;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod notify;
pub mod orchestrator;
pub mod queue;
pub mod shares;

use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use waitlist_tiers::schedule::TierSchedule;
use waitlist_types::events::WaitlistEvent;
use waitlist_types::{DEFAULT_BATCH_SIZE, DEFAULT_SPOTS_PER_BATCH, DEFAULT_SPOTS_PER_SHARE};

pub use error::{Result, WaitlistError};
pub use notify::{Notifier, NullNotifier};

use crate::locks::KeyedLocks;

/// Spot rewards for referrals and shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    /// Verified referrals per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Spots credited per completed batch.
    #[serde(default = "default_spots_per_batch")]
    pub spots_per_batch: u64,
    /// Spots credited per verified share.
    #[serde(default = "default_spots_per_share")]
    pub spots_per_share: u64,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_spots_per_batch() -> u64 {
    DEFAULT_SPOTS_PER_BATCH
}

fn default_spots_per_share() -> u64 {
    DEFAULT_SPOTS_PER_SHARE
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            spots_per_batch: default_spots_per_batch(),
            spots_per_share: default_spots_per_share(),
        }
    }
}

/// Shared database handle.
pub type Db = Arc<Mutex<Connection>>;

/// The waitlist service. Cheap to share behind an `Arc`.
pub struct Waitlist {
    db: Db,
    schedule: TierSchedule,
    rewards: Rewards,
    notifier: Arc<dyn Notifier>,
    locks: KeyedLocks,
}

impl Waitlist {
    /// Build a waitlist over an already-migrated connection.
    pub fn new(
        db: Db,
        schedule: TierSchedule,
        rewards: Rewards,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            schedule,
            rewards,
            notifier,
            locks: KeyedLocks::new(),
        }
    }

    pub fn schedule(&self) -> &TierSchedule {
        &self.schedule
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    fn emit(&self, event: WaitlistEvent) {
        self.notifier.notify(event);
    }
}

/// Current Unix time in seconds.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Shorten an email for log lines: first character of the local part plus
/// the domain.
pub(crate) fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().unwrap_or('*');
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
