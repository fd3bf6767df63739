//! Notifications emitted by the core for the notification collaborator.

use serde::{Deserialize, Serialize};

use crate::entrant::EntrantStatus;
use crate::{EntrantId, Position, PriceCents, TierNumber};

/// Envelope pushed to event subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    /// Unix seconds.
    pub timestamp: u64,
    pub payload: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EntrantAdmitted,
    TierChanged,
    EntrantStatusChanged,
    DaemonStatus,
}

/// A new entrant received a position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct EntrantAdmitted {
    pub entrant_id: EntrantId,
    pub position: Position,
    pub tier: TierNumber,
    pub price_cents: PriceCents,
}

/// `tier_current` moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TierChanged {
    pub entrant_id: EntrantId,
    pub old_tier: TierNumber,
    pub new_tier: TierNumber,
    pub new_price_cents: PriceCents,
}

/// Lifecycle status moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct EntrantStatusChanged {
    pub entrant_id: EntrantId,
    pub old_status: EntrantStatus,
    pub new_status: EntrantStatus,
}

/// Every notification the core can produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitlistEvent {
    EntrantAdmitted(EntrantAdmitted),
    TierChanged(TierChanged),
    EntrantStatusChanged(EntrantStatusChanged),
}

impl WaitlistEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::EntrantAdmitted(_) => EventType::EntrantAdmitted,
            Self::TierChanged(_) => EventType::TierChanged,
            Self::EntrantStatusChanged(_) => EventType::EntrantStatusChanged,
        }
    }

    pub fn entrant_id(&self) -> &str {
        match self {
            Self::EntrantAdmitted(e) => &e.entrant_id,
            Self::TierChanged(e) => &e.entrant_id,
            Self::EntrantStatusChanged(e) => &e.entrant_id,
        }
    }

    /// Wrap into a subscriber envelope.
    pub fn into_event(self, timestamp: u64) -> Event {
        let event_type = self.event_type();
        let payload = match self {
            Self::EntrantAdmitted(e) => serde_json::to_value(e),
            Self::TierChanged(e) => serde_json::to_value(e),
            Self::EntrantStatusChanged(e) => serde_json::to_value(e),
        }
        .unwrap_or(serde_json::Value::Null);
        Event {
            event_type,
            timestamp,
            payload,
        }
    }
}
