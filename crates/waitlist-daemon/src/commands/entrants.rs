//! Entrant command handlers.

use std::sync::Arc;

use serde_json::Value;

use super::{required_str, to_json, Result};
use crate::DaemonState;

/// Default page size for `list_queue`.
const DEFAULT_PAGE: u32 = 50;

/// Recompute an entrant's effective tier.
pub async fn recompute(state: &Arc<DaemonState>, params: &Value) -> Result {
    let entrant_id = required_str(params, "entrant_id")?;
    let quote = state.waitlist.recompute(entrant_id).await?;
    to_json(&quote)
}

/// Full status view of one entrant.
pub async fn entrant_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let entrant_id = required_str(params, "entrant_id")?;
    let view = state.waitlist.entrant_status(entrant_id).await?;
    to_json(&view)
}

/// `pending → active`.
pub async fn activate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let entrant_id = required_str(params, "entrant_id")?;
    let status = state.waitlist.activate(entrant_id).await?;
    Ok(serde_json::json!({ "status": status }))
}

/// Suspend a pending or active entrant.
pub async fn suspend(state: &Arc<DaemonState>, params: &Value) -> Result {
    let entrant_id = required_str(params, "entrant_id")?;
    let status = state.waitlist.suspend(entrant_id).await?;
    Ok(serde_json::json!({ "status": status }))
}

/// Page through the queue in position order.
pub async fn list_queue(state: &Arc<DaemonState>, params: &Value) -> Result {
    let offset = params.get("offset").and_then(|v| v.as_u64()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| u32::try_from(l).unwrap_or(u32::MAX))
        .unwrap_or(DEFAULT_PAGE);

    let entrants = state.waitlist.list_queue(offset, limit).await?;
    let result: Vec<Value> = entrants
        .iter()
        .map(|e| {
            serde_json::json!({
                "entrant_id": e.id,
                "position": e.position,
                "tier_current": e.tier_current,
                "price_current": e.price_current,
                "status": e.status,
                "created_at": e.created_at,
            })
        })
        .collect();
    Ok(serde_json::json!(result))
}
