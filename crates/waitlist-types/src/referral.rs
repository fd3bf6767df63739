//! Referral structures.

use serde::{Deserialize, Serialize};

use crate::{BatchId, EntrantId};

/// A referrer → referred-friend relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub id: i64,
    pub referrer_id: EntrantId,
    /// Normalized (lowercase) email of the friend.
    pub referred_email: String,
    /// Set once the friend completes signup.
    pub referred_id: Option<EntrantId>,
    pub verified: bool,
    pub batch_id: Option<BatchId>,
    pub counted_toward_spots: bool,
    /// BLAKE3 fingerprint of the click source IP, if known.
    pub ip_fingerprint: Option<String>,
    pub user_agent: Option<String>,
    /// Unix seconds.
    pub created_at: u64,
    pub verified_at: Option<u64>,
}

/// Referral-click event from the link-resolution collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralClick {
    pub referrer_code: String,
    pub referred_email: String,
    #[serde(default)]
    pub source: ClickSource,
}

/// Fraud data points attached to inbound events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickSource {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A completed referral batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralBatch {
    pub id: BatchId,
    pub referrer_id: EntrantId,
    pub spots_awarded: u64,
    pub completed_at: u64,
}

/// Per-referrer referral counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReferralProgress {
    /// Friends referred but not yet signed up.
    pub pending: u32,
    /// Friends that signed up.
    pub verified: u32,
    /// Verified friends already consumed by a batch.
    pub counted: u32,
    pub batches_completed: u32,
    pub spots_from_referrals: u64,
}

impl ReferralProgress {
    /// Verified referrals still waiting to fill a batch.
    pub fn uncounted(&self) -> u32 {
        self.verified.saturating_sub(self.counted)
    }
}
