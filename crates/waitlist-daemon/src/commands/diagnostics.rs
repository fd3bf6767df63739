//! Event subscription and diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use super::{required_str, to_json, Result};
use crate::events::EventFilter;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Most events returned by one `poll_events` call.
const MAX_POLL: usize = 500;

/// Subscribe to daemon events.
pub async fn subscribe_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let filter = match params.get("filter") {
        Some(filter) if !filter.is_null() => serde_json::from_value::<EventFilter>(filter.clone())
            .map_err(|e| RpcError::invalid_params(&format!("filter: {e}")))?,
        _ => EventFilter::default(),
    };
    let subscription_id = state
        .event_bus
        .open_subscription(filter)
        .await
        .map_err(|e| RpcError::try_again(&e.to_string()))?;
    Ok(serde_json::json!({ "subscription_id": subscription_id }))
}

/// Drain buffered events of a subscription.
pub async fn poll_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let subscription_id = required_str(params, "subscription_id")?;
    let max = params
        .get("max")
        .and_then(|v| v.as_u64())
        .map_or(MAX_POLL, |m| (m as usize).min(MAX_POLL));
    let drained = state
        .event_bus
        .drain(subscription_id, max)
        .await
        .ok_or_else(|| RpcError::not_found("subscription"))?;
    to_json(&drained)
}

/// Unsubscribe from daemon events.
pub async fn unsubscribe_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let subscription_id = required_str(params, "subscription_id")?;
    let existed = state.event_bus.close_subscription(subscription_id).await;
    Ok(serde_json::json!({ "unsubscribed": existed }))
}

/// Version, queue depth, reward settings and event counter.
pub async fn daemon_status(state: &Arc<DaemonState>) -> Result {
    let (last_position, entrants) = state.waitlist.queue_depth().await?;
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "data_dir": state.config.data_dir(),
        "rewards": state.config.rewards,
        "last_position": last_position,
        "entrants": entrants,
        "event_sequence": state.event_bus.sequence(),
        "subscriptions": state.event_bus.subscription_count().await,
    }))
}

/// Ask the daemon to stop after this response.
pub async fn shutdown(state: &Arc<DaemonState>) -> Result {
    tracing::info!("shutdown requested over RPC");
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({ "shutting_down": true }))
}
