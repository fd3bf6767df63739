//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod admission;
pub mod diagnostics;
pub mod entrants;
pub mod referrals;
pub mod shares;

use serde::Serialize;
use serde_json::Value;
use waitlist_types::referral::ClickSource;

use crate::rpc::RpcError;

type Result = std::result::Result<Value, RpcError>;

/// Serialize a handler result.
fn to_json<T: Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode: {e}")))
}

/// A required string parameter.
fn required_str<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional fraud data points attached to an inbound event.
fn click_source(params: &Value) -> ClickSource {
    let text = |key: &str| params.get(key).and_then(|v| v.as_str()).map(str::to_string);
    ClickSource {
        ip_address: text("ip_address"),
        user_agent: text("user_agent"),
    }
}
