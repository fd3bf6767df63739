//! Signup and pricing command handlers.

use std::sync::Arc;

use serde_json::Value;
use waitlist_types::entrant::SignupIdentity;

use super::{required_str, to_json, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Admit an identity-verified signup.
pub async fn signup(state: &Arc<DaemonState>, params: &Value) -> Result {
    let email = required_str(params, "email")?;
    let display_name = params
        .get("display_name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let verified_at = params
        .get("verified_at")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(crate::now);

    let receipt = state
        .waitlist
        .signup(SignupIdentity {
            email: email.to_string(),
            display_name: display_name.to_string(),
            verified_at,
        })
        .await?;
    to_json(&receipt)
}

/// Tier and price for a position.
pub async fn tier_quote(state: &Arc<DaemonState>, params: &Value) -> Result {
    let position = params
        .get("position")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("position required"))?;
    let quote = state
        .waitlist
        .schedule()
        .tier_for(position)
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    to_json(&quote)
}

/// Public counter widget.
pub async fn counter_snapshot(state: &Arc<DaemonState>) -> Result {
    let snapshot = state.waitlist.counter_snapshot().await?;
    to_json(&snapshot)
}
