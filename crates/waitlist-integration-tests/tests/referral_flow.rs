//! Integration test: referral links through to tier movement.
//!
//! 1. A referrer shares their code; friends click it and later sign up
//! 2. The third verified friend completes a batch and credits spots
//! 3. Replays of the batch or of a friend's signup award nothing more
//! 4. Batches repeat for every further group of three

use waitlist_core::{Rewards, Waitlist, WaitlistError};
use waitlist_crypto::codes;
use waitlist_integration_tests::{burn_positions, identity, waitlist};
use waitlist_types::referral::{ClickSource, ReferralClick};

fn click(code: &str, email: &str) -> ReferralClick {
    ReferralClick {
        referrer_code: code.to_string(),
        referred_email: email.to_string(),
        source: ClickSource {
            ip_address: Some("198.51.100.7".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        },
    }
}

async fn friend_joins(waitlist: &Waitlist, code: &str, email: &str) {
    waitlist
        .record_referral_click(&click(code, email))
        .await
        .expect("click");
    waitlist
        .signup(identity(email, "Friend"))
        .await
        .expect("friend signup");
}

#[tokio::test]
async fn three_friends_complete_one_batch() {
    // Ten spots per batch moves position 105 to an effective 95.
    let (waitlist, notifier) = waitlist(Rewards::default()).expect("waitlist");
    burn_positions(&waitlist, 104).await.expect("burn");
    let referrer = waitlist
        .signup(identity("host@example.com", "Host"))
        .await
        .expect("referrer signup");
    assert_eq!(referrer.position, 105);
    assert_eq!(referrer.tier, 2);

    friend_joins(&waitlist, &referrer.referral_code, "f1@example.com").await;
    friend_joins(&waitlist, &referrer.referral_code, "f2@example.com").await;

    let view = waitlist
        .entrant_status(&referrer.entrant_id)
        .await
        .expect("status");
    assert_eq!(view.referrals.verified, 2);
    assert_eq!(view.referrals.batches_completed, 0);
    assert_eq!(view.tier_current, 2);

    friend_joins(&waitlist, &referrer.referral_code, "f3@example.com").await;

    let view = waitlist
        .entrant_status(&referrer.entrant_id)
        .await
        .expect("status");
    assert_eq!(view.referrals.counted, 3);
    assert_eq!(view.referrals.batches_completed, 1);
    assert_eq!(view.spots_awarded, 10);
    assert_eq!(view.position, 105, "position never moves");
    assert_eq!(view.tier_current, 1);
    assert_eq!(view.price_current, 1900);
    assert_eq!(view.tier_at_signup, 2);
    assert_eq!(view.price_at_signup, 2400);

    assert_eq!(notifier.tier_changes(&referrer.entrant_id), vec![(2, 1)]);

    // Replays award nothing.
    let again = waitlist
        .try_complete_batch(&referrer.entrant_id)
        .await
        .expect("replay batch");
    assert_eq!(again, 0);
    let friend = waitlist
        .signup(identity("f3@example.com", "Friend"))
        .await
        .expect("replayed friend signup");
    assert!(!friend.created);
    let view = waitlist
        .entrant_status(&referrer.entrant_id)
        .await
        .expect("status");
    assert_eq!(view.spots_awarded, 10);
    assert_eq!(view.referrals.batches_completed, 1);
}

#[tokio::test]
async fn batches_repeat_per_group_of_three() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");
    let referrer = waitlist
        .signup(identity("host@example.com", "Host"))
        .await
        .expect("referrer signup");

    for i in 0..7 {
        friend_joins(
            &waitlist,
            &referrer.referral_code,
            &format!("friend{i}@example.com"),
        )
        .await;
    }

    let view = waitlist
        .entrant_status(&referrer.entrant_id)
        .await
        .expect("status");
    assert_eq!(view.referrals.batches_completed, 2);
    assert_eq!(view.referrals.counted, 6);
    assert_eq!(view.referrals.verified, 7);
    assert_eq!(view.spots_awarded, 20);
    // Already in the best tier.
    assert_eq!(view.tier_current, 1);
}

#[tokio::test]
async fn same_friend_referred_twice_counts_once() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");
    let referrer = waitlist
        .signup(identity("host@example.com", "Host"))
        .await
        .expect("referrer signup");

    let first = waitlist
        .record_referral_click(&click(&referrer.referral_code, "twice@example.com"))
        .await
        .expect("first click");
    let second = waitlist
        .record_referral_click(&click(&referrer.referral_code, "TWICE@example.com"))
        .await
        .expect("second click");
    assert_eq!(first.id, second.id);
    assert!(first.ip_fingerprint.is_some());
    assert_ne!(first.ip_fingerprint.as_deref(), Some("198.51.100.7"));

    waitlist
        .signup(identity("twice@example.com", "Twice"))
        .await
        .expect("signup");

    let view = waitlist
        .entrant_status(&referrer.entrant_id)
        .await
        .expect("status");
    assert_eq!(view.referrals.verified, 1);
    assert_eq!(view.referrals.pending, 0);
}

#[tokio::test]
async fn referral_links_are_validated() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");
    let referrer = waitlist
        .signup(identity("host@example.com", "Host"))
        .await
        .expect("referrer signup");
    waitlist
        .signup(identity("member@example.com", "Member"))
        .await
        .expect("member signup");

    let err = waitlist
        .record_referral_click(&click("NOBODY-0000", "new@example.com"))
        .await
        .expect_err("unknown code");
    assert!(matches!(err, WaitlistError::UnknownReferralCode(_)));

    let err = waitlist
        .record_referral_click(&click(&referrer.referral_code, "host@example.com"))
        .await
        .expect_err("self referral");
    assert!(matches!(err, WaitlistError::SelfReferral));

    let err = waitlist
        .record_referral_click(&click(&referrer.referral_code, "member@example.com"))
        .await
        .expect_err("existing entrant");
    assert!(matches!(err, WaitlistError::AlreadyOnWaitlist));

    // Codes are matched after normalization.
    let lowercase = referrer.referral_code.to_ascii_lowercase();
    assert_eq!(codes::normalize_code(&lowercase), referrer.referral_code);
    waitlist
        .record_referral_click(&click(&lowercase, "new@example.com"))
        .await
        .expect("lowercase code");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batch_attempts_award_once() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");
    let referrer = waitlist
        .signup(identity("host@example.com", "Host"))
        .await
        .expect("referrer signup");

    // Verify three referrals without letting signup complete the batch.
    for i in 0..3 {
        let email = format!("race{i}@example.com");
        waitlist
            .record_referral_click(&click(&referrer.referral_code, &email))
            .await
            .expect("click");
    }
    {
        let db = waitlist.db().lock().await;
        db.execute(
            "UPDATE referrals SET verified = 1, verified_at = 1 WHERE referrer_id = ?1",
            [&referrer.entrant_id],
        )
        .expect("verify directly");
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let waitlist = waitlist.clone();
        let referrer_id = referrer.entrant_id.clone();
        handles.push(tokio::spawn(async move {
            waitlist
                .try_complete_batch(&referrer_id)
                .await
                .expect("batch attempt")
        }));
    }
    let mut total = 0;
    for handle in handles {
        total += handle.await.expect("join");
    }
    assert_eq!(total, 10);
}
