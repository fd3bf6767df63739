//! Signup orchestrator.
//!
//! One transaction covers the email lookup, the position claim, the
//! referral-code search, the entrant insert and the verification of pending
//! referrals naming the new email. A replayed signup finds the entrant in the
//! first step and returns it unchanged.

use rusqlite::{Connection, TransactionBehavior};
use tracing::{error, info, warn};
use waitlist_crypto::codes;
use waitlist_db::queries::{entrants, referrals, sequence};
use waitlist_tiers::schedule::TierSchedule;
use waitlist_types::entrant::{Entrant, EntrantStatus, SignupIdentity, SignupReceipt};
use waitlist_types::events::{EntrantAdmitted, WaitlistEvent};
use waitlist_types::{is_plausible_email, normalize_email, EntrantId};

use crate::allocator;
use crate::{now, redact_email, Result, Waitlist, WaitlistError};

/// Attempts at the allocate-and-persist unit before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Referral-code derivations tried before giving up.
pub const MAX_CODE_ATTEMPTS: u32 = 16;

/// Longest display name kept.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

enum Admission {
    Existing(Entrant),
    Created {
        entrant: Entrant,
        referrers: Vec<EntrantId>,
    },
}

impl Waitlist {
    /// Admit a verified identity to the waitlist.
    ///
    /// Replays with the same email return the original position, tier and
    /// referral code with `created == false`. Pending referrals of the email
    /// are verified and each affected referrer gets a batch attempt.
    pub async fn signup(&self, identity: SignupIdentity) -> Result<SignupReceipt> {
        let email = normalize_email(&identity.email);
        if !is_plausible_email(&email) {
            warn!("signup rejected: implausible email");
            return Err(WaitlistError::InvalidEmail);
        }
        let display_name: String = identity
            .display_name
            .trim()
            .chars()
            .take(MAX_DISPLAY_NAME_LEN)
            .collect();

        let admission = {
            let mut db = self.db.lock().await;
            admit(
                &mut db,
                &self.schedule,
                &email,
                &display_name,
                identity.verified_at,
                now(),
            )?
        };

        let (receipt, referrers) = match admission {
            Admission::Created { entrant, referrers } => {
                info!(
                    entrant_id = %entrant.id,
                    position = entrant.position,
                    tier = entrant.tier_at_signup,
                    "entrant admitted"
                );
                self.emit(WaitlistEvent::EntrantAdmitted(EntrantAdmitted {
                    entrant_id: entrant.id.clone(),
                    position: entrant.position,
                    tier: entrant.tier_at_signup,
                    price_cents: entrant.price_at_signup,
                }));
                (entrant.receipt(true), referrers)
            }
            Admission::Existing(entrant) => {
                // Re-run batch attempts so a retry after a partial failure heals.
                let referrers = {
                    let db = self.db.lock().await;
                    referrals::verified_referrers_of(&db, &entrant.email)?
                };
                (entrant.receipt(false), referrers)
            }
        };

        for referrer_id in referrers {
            self.try_complete_batch(&referrer_id).await?;
        }
        Ok(receipt)
    }
}

fn admit(
    conn: &mut Connection,
    schedule: &TierSchedule,
    email: &str,
    display_name: &str,
    verified_at: u64,
    created_at: u64,
) -> Result<Admission> {
    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) = entrants::find_by_email(&tx, email)? {
            return Ok(Admission::Existing(existing));
        }

        let position = allocator::claim(&tx)?;
        let quote = schedule.quote(position);
        let referral_code = unique_code(&tx, display_name, email)?;
        let entrant = Entrant {
            id: codes::entrant_id(email),
            email: email.to_string(),
            display_name: display_name.to_string(),
            position,
            tier_at_signup: quote.tier,
            price_at_signup: quote.price_cents,
            tier_current: quote.tier,
            price_current: quote.price_cents,
            spots_awarded: 0,
            referral_code,
            status: EntrantStatus::Pending,
            created_at,
            verified_at,
        };

        match entrants::insert(&tx, &entrant) {
            Ok(()) => {
                let referrers = referrals::verify_by_email(&tx, email, &entrant.id, created_at)?;
                tx.commit()?;
                return Ok(Admission::Created { entrant, referrers });
            }
            Err(err) if err.is_unique_violation_on("entrants.email") => {
                drop(tx);
                warn!(email = %redact_email(email), "concurrent signup won; returning existing entrant");
                let existing = entrants::find_by_email(conn, email)?
                    .ok_or_else(|| WaitlistError::EntrantNotFound(redact_email(email)))?;
                return Ok(Admission::Existing(existing));
            }
            Err(err @ waitlist_db::DbError::UniqueViolation(_)) => {
                // Position, id or code taken by a row the sequence did not
                // account for. Roll back, repair the sequence and retry.
                drop(tx);
                warn!(attempt, error = %err, "allocation conflict; resyncing sequence");
                sequence::resync(conn)?;
            }
            Err(err) => {
                error!(error = %err, "entrant insert failed");
                return Err(err.into());
            }
        }
    }
    Err(WaitlistError::AllocationConflict {
        attempts: MAX_ALLOCATION_ATTEMPTS,
    })
}

/// First referral code for this identity that is not already taken.
fn unique_code(conn: &Connection, display_name: &str, email: &str) -> Result<String> {
    for attempt in 0..MAX_CODE_ATTEMPTS {
        let code = codes::referral_code(display_name, email, attempt);
        if !entrants::code_exists(conn, &code)? {
            return Ok(code);
        }
        warn!(attempt, "referral code collision; deriving another");
    }
    Err(WaitlistError::CodeSpaceExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use waitlist_db::queries::entrants;
    use waitlist_types::events::WaitlistEvent;

    use super::*;
    use crate::testing::{entrant_row, identity, waitlist};

    #[tokio::test]
    async fn test_signup_assigns_position_tier_and_code() {
        let (waitlist, notifier) = waitlist();
        let receipt = waitlist
            .signup(identity("Priya@Example.com", "Priya Raman"))
            .await
            .expect("signup");

        assert!(receipt.created);
        assert_eq!(receipt.position, 1);
        assert_eq!(receipt.tier, 1);
        assert_eq!(receipt.price_cents, 1900);
        assert!(receipt.referral_code.starts_with("PRIYA-"));
        assert_eq!(receipt.entrant_id.len(), 32);

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], WaitlistEvent::EntrantAdmitted(e) if e.position == 1));
    }

    #[tokio::test]
    async fn test_signup_is_idempotent() {
        let (waitlist, notifier) = waitlist();
        let first = waitlist
            .signup(identity("ada@example.com", "Ada"))
            .await
            .expect("first");
        let replay = waitlist
            .signup(identity("  ADA@example.com ", "Ada Lovelace"))
            .await
            .expect("replay");

        assert!(!replay.created);
        assert_eq!(replay.entrant_id, first.entrant_id);
        assert_eq!(replay.position, first.position);
        assert_eq!(replay.referral_code, first.referral_code);
        assert_eq!(waitlist.last_position().await.expect("last"), 1);
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_same_display_name_distinct_codes() {
        let (waitlist, _) = waitlist();
        let a = waitlist
            .signup(identity("priya1@example.com", "Priya"))
            .await
            .expect("a");
        let b = waitlist
            .signup(identity("priya2@example.com", "Priya"))
            .await
            .expect("b");
        assert_ne!(a.referral_code, b.referral_code);
        assert!(a.referral_code.starts_with("PRIYA-"));
        assert!(b.referral_code.starts_with("PRIYA-"));
    }

    #[tokio::test]
    async fn test_code_collision_takes_next_derivation() {
        let (waitlist, _) = waitlist();
        let taken = codes::referral_code("Sam", "sam@example.com", 0);
        {
            let db = waitlist.db().lock().await;
            let mut squatter = entrant_row("sq", "squat@example.com", 1, &taken);
            squatter.display_name = "Squatter".to_string();
            entrants::insert(&db, &squatter).expect("squatter");
            sequence::resync(&db).expect("resync");
        }

        let receipt = waitlist
            .signup(identity("sam@example.com", "Sam"))
            .await
            .expect("signup");
        assert_eq!(
            receipt.referral_code,
            codes::referral_code("Sam", "sam@example.com", 1)
        );
        assert_eq!(receipt.position, 2);
    }

    #[tokio::test]
    async fn test_lagging_sequence_is_repaired() {
        let (waitlist, _) = waitlist();
        {
            let db = waitlist.db().lock().await;
            let row = entrant_row("old", "old@example.com", 1, "OLD-1");
            entrants::insert(&db, &row).expect("imported row");
        }

        let receipt = waitlist
            .signup(identity("new@example.com", "New"))
            .await
            .expect("signup");
        assert_eq!(receipt.position, 2);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let (waitlist, _) = waitlist();
        let err = waitlist
            .signup(identity("not-an-email", "X"))
            .await
            .expect_err("invalid");
        assert!(matches!(err, WaitlistError::InvalidEmail));
        assert_eq!(waitlist.last_position().await.expect("last"), 0);
    }

    #[tokio::test]
    async fn test_tier_boundary_at_101() {
        let (waitlist, _) = waitlist();
        {
            let db = waitlist.db().lock().await;
            db.execute("UPDATE position_sequence SET last_value = 99 WHERE id = 1", [])
                .expect("seed");
        }
        let hundredth = waitlist
            .signup(identity("p100@example.com", "P"))
            .await
            .expect("100");
        let next = waitlist
            .signup(identity("p101@example.com", "P"))
            .await
            .expect("101");
        assert_eq!((hundredth.position, hundredth.tier), (100, 1));
        assert_eq!((next.position, next.tier, next.price_cents), (101, 2, 2400));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_signups_dense_positions() {
        const N: u64 = 100;
        let (waitlist, _) = waitlist();

        let mut handles = Vec::new();
        for i in 0..N {
            let waitlist = waitlist.clone();
            handles.push(tokio::spawn(async move {
                waitlist
                    .signup(identity(&format!("user{i}@example.com"), "User"))
                    .await
            }));
        }
        let mut positions = BTreeSet::new();
        let mut codes = BTreeSet::new();
        for handle in handles {
            let receipt = handle.await.expect("task").expect("signup");
            positions.insert(receipt.position);
            codes.insert(receipt.referral_code);
        }
        assert_eq!(positions, (1..=N).collect::<BTreeSet<_>>());
        assert_eq!(codes.len(), N as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_signups_share_one_entrant() {
        let (waitlist, _) = waitlist();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let waitlist = waitlist.clone();
            handles.push(tokio::spawn(async move {
                waitlist.signup(identity("same@example.com", "Same")).await
            }));
        }
        let mut ids = BTreeSet::new();
        let mut created = 0;
        for handle in handles {
            let receipt = handle.await.expect("task").expect("signup");
            ids.insert(receipt.entrant_id);
            created += usize::from(receipt.created);
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(waitlist.last_position().await.expect("last"), 1);
    }
}
