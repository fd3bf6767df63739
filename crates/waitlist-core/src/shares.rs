//! Social share tracker.
//!
//! One record per (user, platform). Verification credits the configured
//! spots exactly once; a replay returns 0 and writes nothing.

use rusqlite::TransactionBehavior;
use tracing::{debug, info};
use waitlist_db::queries::{entrants, shares};
use waitlist_types::referral::ClickSource;
use waitlist_types::share::{Platform, SocialShareRecord};

use crate::{now, Result, Waitlist, WaitlistError};

impl Waitlist {
    /// Record an unverified share. A repeat for the same platform is a no-op.
    ///
    /// Returns whether a new record was written.
    pub async fn record_share(
        &self,
        user_id: &str,
        platform: Platform,
        source: &ClickSource,
    ) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        entrants::get(&tx, user_id)?;
        let created = shares::insert(
            &tx,
            user_id,
            platform,
            source.ip_address.as_deref(),
            source.user_agent.as_deref(),
            now(),
        )?;
        tx.commit()?;
        debug!(user_id, %platform, created, "share recorded");
        Ok(created)
    }

    /// Mark a share verified and credit spots once.
    ///
    /// A verification for a share that was never recorded records it first.
    /// Returns the spots awarded by this call: the configured amount the first
    /// time, 0 on every replay.
    pub async fn verify_share(
        &self,
        user_id: &str,
        platform: Platform,
        verified_at: u64,
    ) -> Result<u64> {
        let _guard = self.locks.lock(user_id).await;
        let spots = self.rewards.spots_per_share;

        let awarded = {
            let mut db = self.db.lock().await;
            let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
            entrants::get(&tx, user_id)?;
            shares::insert(&tx, user_id, platform, None, None, verified_at)?;
            let awarded = shares::verify(&tx, user_id, platform, spots, verified_at)?;
            tx.commit()?;
            awarded
        };

        if !awarded {
            debug!(user_id, %platform, "share already verified");
            return Ok(0);
        }
        info!(user_id, %platform, spots, "share verified");
        self.recompute_held(user_id).await?;
        Ok(spots)
    }

    /// All share records of a user.
    pub async fn shares_of(&self, user_id: &str) -> Result<Vec<SocialShareRecord>> {
        let db = self.db.lock().await;
        entrants::get(&db, user_id)?;
        Ok(shares::list_for_user(&db, user_id)?)
    }
}

/// Parse an inbound platform name.
pub fn parse_platform(name: &str) -> Result<Platform> {
    name.parse::<Platform>().map_err(WaitlistError::from)
}

#[cfg(test)]
mod tests {
    use waitlist_types::referral::ClickSource;
    use waitlist_types::share::Platform;

    use super::parse_platform;
    use crate::testing::{identity, waitlist};
    use crate::WaitlistError;

    #[tokio::test]
    async fn test_record_share_once_per_platform() {
        let (waitlist, _) = waitlist();
        let user = waitlist
            .signup(identity("u@example.com", "U"))
            .await
            .expect("signup")
            .entrant_id;
        let source = ClickSource {
            ip_address: Some("203.0.113.4".to_string()),
            user_agent: None,
        };
        assert!(waitlist.record_share(&user, Platform::X, &source).await.expect("first"));
        assert!(!waitlist.record_share(&user, Platform::X, &source).await.expect("repeat"));
        assert!(waitlist
            .record_share(&user, Platform::Reddit, &source)
            .await
            .expect("other platform"));
        assert_eq!(waitlist.shares_of(&user).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_replayed_verification_awards_once() {
        let (waitlist, _) = waitlist();
        let user = waitlist
            .signup(identity("u@example.com", "U"))
            .await
            .expect("signup")
            .entrant_id;
        waitlist
            .record_share(&user, Platform::Linkedin, &ClickSource::default())
            .await
            .expect("record");

        assert_eq!(waitlist.verify_share(&user, Platform::Linkedin, 10).await.expect("v1"), 5);
        assert_eq!(waitlist.verify_share(&user, Platform::Linkedin, 11).await.expect("v2"), 0);

        let view = waitlist.entrant_status(&user).await.expect("status");
        assert_eq!(view.spots_awarded, 5);
        assert_eq!(view.verified_platforms, vec![Platform::Linkedin]);
    }

    #[tokio::test]
    async fn test_verify_unrecorded_share() {
        let (waitlist, _) = waitlist();
        let user = waitlist
            .signup(identity("u@example.com", "U"))
            .await
            .expect("signup")
            .entrant_id;
        assert_eq!(waitlist.verify_share(&user, Platform::Whatsapp, 10).await.expect("v"), 5);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (waitlist, _) = waitlist();
        let err = waitlist
            .verify_share("ghost", Platform::X, 10)
            .await
            .expect_err("unknown");
        assert!(matches!(err, WaitlistError::EntrantNotFound(_)));
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform("Twitter").expect("alias"), Platform::X);
        assert!(matches!(
            parse_platform("myspace"),
            Err(WaitlistError::InvalidPlatform(_))
        ));
    }
}
