//! Referral ledger.
//!
//! A referral is keyed by (referrer, friend email), so referring the same
//! friend twice leaves one record. It turns verified when the friend signs
//! up, and is consumed by exactly one batch. Batch completion for a referrer
//! holds that referrer's lock, selects the oldest uncounted verified
//! referrals, marks them counted and writes the batch in one transaction.

use rusqlite::TransactionBehavior;
use tracing::{debug, info, warn};
use waitlist_crypto::codes;
use waitlist_db::queries::{entrants, referrals};
use waitlist_db::DbError;
use waitlist_types::referral::{ClickSource, ReferralClick, ReferralRecord};
use waitlist_types::{is_plausible_email, normalize_email, EntrantId};

use crate::{now, Result, Waitlist, WaitlistError};

impl Waitlist {
    /// Record that `referrer_id` referred `referred_email`.
    ///
    /// Returns the stored record; a repeat of the same pair returns the
    /// original record untouched.
    ///
    /// # Errors
    ///
    /// - [`WaitlistError::SelfReferral`] if the email is the referrer's own
    /// - [`WaitlistError::AlreadyOnWaitlist`] if the email already holds a position
    /// - [`WaitlistError::EntrantNotFound`] for an unknown referrer
    pub async fn record_referral(
        &self,
        referrer_id: &str,
        referred_email: &str,
        source: &ClickSource,
    ) -> Result<ReferralRecord> {
        let email = normalize_email(referred_email);
        if !is_plausible_email(&email) {
            return Err(WaitlistError::InvalidEmail);
        }
        let fingerprint = source.ip_address.as_deref().map(codes::ip_fingerprint);

        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let referrer = entrants::get(&tx, referrer_id)?;
        if referrer.email == email {
            warn!(referrer_id, "self-referral rejected");
            return Err(WaitlistError::SelfReferral);
        }
        if entrants::find_by_email(&tx, &email)?.is_some() {
            debug!(referrer_id, "referral of existing entrant rejected");
            return Err(WaitlistError::AlreadyOnWaitlist);
        }

        let created = referrals::insert(
            &tx,
            referrer_id,
            &email,
            fingerprint.as_deref(),
            source.user_agent.as_deref(),
            now(),
        )?;
        let record = referrals::get(&tx, referrer_id, &email)?.ok_or_else(|| {
            WaitlistError::Storage(DbError::NoRowsWritten(format!("referral by {referrer_id}")))
        })?;
        tx.commit()?;

        if created {
            info!(referrer_id, referral_id = record.id, "referral recorded");
        }
        Ok(record)
    }

    /// Resolve a referral click by code and record the referral.
    pub async fn record_referral_click(&self, click: &ReferralClick) -> Result<ReferralRecord> {
        let code = codes::normalize_code(&click.referrer_code);
        let referrer = {
            let db = self.db.lock().await;
            entrants::find_by_code(&db, &code)?
        }
        .ok_or(WaitlistError::UnknownReferralCode(code))?;

        self.record_referral(&referrer.id, &click.referred_email, &click.source)
            .await
    }

    /// Mark every pending referral of `referred_email` verified by the
    /// entrant `referred_id`, then attempt a batch for each referrer.
    ///
    /// Signup performs the same verification inside its own transaction;
    /// this entry point serves replays from the identity collaborator.
    /// Returns the referrers whose records flipped.
    pub async fn verify_referral(
        &self,
        referred_email: &str,
        referred_id: &str,
    ) -> Result<Vec<EntrantId>> {
        let email = normalize_email(referred_email);
        let referrers = {
            let mut db = self.db.lock().await;
            let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let referred = entrants::get(&tx, referred_id)?;
            if referred.email != email {
                return Err(WaitlistError::EntrantNotFound(referred_id.to_string()));
            }
            let referrers = referrals::verify_by_email(&tx, &email, referred_id, now())?;
            tx.commit()?;
            referrers
        };

        for referrer_id in &referrers {
            self.try_complete_batch(referrer_id).await?;
        }
        Ok(referrers)
    }

    /// Complete one batch for `referrer_id` if enough verified referrals are
    /// uncounted. Returns the spots awarded, or 0 when no batch was formed.
    ///
    /// Serialized per referrer; calling it again with the same referrals
    /// awards nothing.
    pub async fn try_complete_batch(&self, referrer_id: &str) -> Result<u64> {
        let _guard = self.locks.lock(referrer_id).await;
        let batch_size = self.rewards.batch_size.max(1);
        let spots = self.rewards.spots_per_batch;

        let batch_id = {
            let mut db = self.db.lock().await;
            let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
            entrants::get(&tx, referrer_id)?;

            let eligible = referrals::uncounted_verified(&tx, referrer_id, batch_size)?;
            if eligible.len() < batch_size as usize {
                debug!(referrer_id, eligible = eligible.len(), "batch not ready");
                return Ok(0);
            }
            let batch_id = referrals::insert_batch(&tx, referrer_id, spots, now())?;
            referrals::mark_counted(&tx, &eligible, batch_id)?;
            tx.commit()?;
            batch_id
        };

        info!(referrer_id, batch_id, spots, "referral batch completed");
        self.recompute_held(referrer_id).await?;
        Ok(spots)
    }
}
