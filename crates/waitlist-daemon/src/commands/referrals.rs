//! Referral command handlers.

use std::sync::Arc;

use serde_json::Value;
use waitlist_types::referral::ReferralClick;

use super::{click_source, required_str, to_json, Result};
use crate::DaemonState;

/// Record a referral by referrer id.
pub async fn record_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let referrer_id = required_str(params, "referrer_id")?;
    let referred_email = required_str(params, "referred_email")?;
    let record = state
        .waitlist
        .record_referral(referrer_id, referred_email, &click_source(params))
        .await?;
    to_json(&record)
}

/// Resolve a referral link click and record the referral.
pub async fn record_referral_click(state: &Arc<DaemonState>, params: &Value) -> Result {
    let click = ReferralClick {
        referrer_code: required_str(params, "referrer_code")?.to_string(),
        referred_email: required_str(params, "referred_email")?.to_string(),
        source: click_source(params),
    };
    let record = state.waitlist.record_referral_click(&click).await?;
    to_json(&record)
}

/// Verify pending referrals of a signed-up friend.
pub async fn verify_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let referred_email = required_str(params, "referred_email")?;
    let referred_id = required_str(params, "referred_id")?;
    let referrers = state
        .waitlist
        .verify_referral(referred_email, referred_id)
        .await?;
    Ok(serde_json::json!({ "verified_for": referrers }))
}

/// Attempt one batch for a referrer.
pub async fn complete_batch(state: &Arc<DaemonState>, params: &Value) -> Result {
    let referrer_id = required_str(params, "referrer_id")?;
    let spots = state.waitlist.try_complete_batch(referrer_id).await?;
    Ok(serde_json::json!({ "spots_awarded": spots }))
}
