//! Waitlist entrant structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::referral::ReferralProgress;
use crate::share::Platform;
use crate::{EntrantId, Position, PriceCents, TierNumber};

/// Entrant lifecycle status.
///
/// `pending → active`, `pending → suspended`, `active → suspended`.
/// There is no transition out of `suspended`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntrantStatus {
    Pending,
    Active,
    Suspended,
}

impl EntrantStatus {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    /// Whether `self → next` is an allowed lifecycle transition.
    pub fn can_transition_to(self, next: EntrantStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::Suspended)
                | (Self::Active, Self::Suspended)
        )
    }
}

impl fmt::Display for EntrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized status string read from storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entrant status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for EntrantStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A persisted waitlist entrant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    /// Normalized (lowercase) email.
    pub email: String,
    pub display_name: String,
    pub position: Position,
    pub tier_at_signup: TierNumber,
    pub price_at_signup: PriceCents,
    pub tier_current: TierNumber,
    pub price_current: PriceCents,
    pub spots_awarded: u64,
    pub referral_code: String,
    pub status: EntrantStatus,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds of the identity verification that created the entrant.
    pub verified_at: u64,
}

impl Entrant {
    /// The synchronous signup response for this entrant.
    pub fn receipt(&self, created: bool) -> SignupReceipt {
        SignupReceipt {
            entrant_id: self.id.clone(),
            position: self.position,
            tier: self.tier_current,
            price_cents: self.price_current,
            referral_code: self.referral_code.clone(),
            created,
        }
    }
}

/// Identity-verified signup event from the auth collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignupIdentity {
    pub email: String,
    pub display_name: String,
    /// Unix seconds.
    pub verified_at: u64,
}

/// Result of a signup. Identical on replay except for `created`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SignupReceipt {
    pub entrant_id: EntrantId,
    pub position: Position,
    pub tier: TierNumber,
    pub price_cents: PriceCents,
    pub referral_code: String,
    /// False when the identity was already on the list.
    pub created: bool,
}

/// Read model returned by the entrant status query.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct EntrantView {
    pub entrant_id: EntrantId,
    pub position: Position,
    pub tier_at_signup: TierNumber,
    pub price_at_signup: PriceCents,
    pub tier_current: TierNumber,
    pub price_current: PriceCents,
    pub spots_awarded: u64,
    pub referral_code: String,
    pub status: EntrantStatus,
    pub referrals: ReferralProgress,
    pub verified_platforms: Vec<Platform>,
}
