//! Social share command handlers.

use std::sync::Arc;

use serde_json::Value;
use waitlist_core::shares::parse_platform;

use super::{click_source, required_str, Result};
use crate::DaemonState;

/// Record an unverified share.
pub async fn record_share(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = required_str(params, "user_id")?;
    let platform = parse_platform(required_str(params, "platform")?)?;
    let created = state
        .waitlist
        .record_share(user_id, platform, &click_source(params))
        .await?;
    Ok(serde_json::json!({ "created": created }))
}

/// Social-share-verified event.
pub async fn verify_share(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = required_str(params, "user_id")?;
    let platform = parse_platform(required_str(params, "platform")?)?;
    let verified_at = params
        .get("verified_at")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(crate::now);
    let spots = state
        .waitlist
        .verify_share(user_id, platform, verified_at)
        .await?;
    Ok(serde_json::json!({ "spots_awarded": spots }))
}
