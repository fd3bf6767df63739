//! Integration test: signup admission end to end.
//!
//! Exercises the orchestrator against real storage:
//! 1. Replayed signups return the original receipt
//! 2. Identical display names get distinct referral codes
//! 3. Tier boundary at position 100/101
//! 4. Concurrent signups produce a dense position range
//! 5. The counter widget follows the queue

use std::collections::HashSet;

use waitlist_core::{Rewards, WaitlistError};
use waitlist_integration_tests::{identity, waitlist};
use waitlist_types::events::WaitlistEvent;

#[tokio::test]
async fn replayed_signup_returns_original_receipt() {
    let (waitlist, notifier) = waitlist(Rewards::default()).expect("waitlist");

    let first = waitlist
        .signup(identity("Ada@Example.com", "Ada"))
        .await
        .expect("first signup");
    let replay = waitlist
        .signup(identity("  ada@example.com ", "Ada Lovelace"))
        .await
        .expect("replay");

    assert!(first.created);
    assert!(!replay.created);
    assert_eq!(first.entrant_id, replay.entrant_id);
    assert_eq!(first.position, replay.position);
    assert_eq!(first.referral_code, replay.referral_code);
    assert_eq!(first.price_cents, replay.price_cents);

    let admitted = notifier
        .events()
        .into_iter()
        .filter(|e| matches!(e, WaitlistEvent::EntrantAdmitted(_)))
        .count();
    assert_eq!(admitted, 1, "a replay must not admit twice");
    assert_eq!(waitlist.last_position().await.expect("last"), 1);
}

#[tokio::test]
async fn same_display_name_gets_distinct_codes() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");

    let mut codes = HashSet::new();
    for i in 0..20 {
        let receipt = waitlist
            .signup(identity(&format!("sam{i}@example.com"), "Sam Smith"))
            .await
            .expect("signup");
        assert!(codes.insert(receipt.referral_code), "duplicate code");
    }
}

#[tokio::test]
async fn hundred_and_first_signup_pays_tier_two() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");

    let mut last = None;
    for i in 1..=100 {
        last = Some(
            waitlist
                .signup(identity(&format!("early{i}@example.com"), "Early"))
                .await
                .expect("signup"),
        );
    }
    let hundredth = last.expect("hundredth signup");
    assert_eq!(hundredth.position, 100);
    assert_eq!(hundredth.tier, 1);
    assert_eq!(hundredth.price_cents, 1900);

    let next = waitlist
        .signup(identity("late@example.com", "Late"))
        .await
        .expect("signup");
    assert_eq!(next.position, 101);
    assert_eq!(next.tier, 2);
    assert_eq!(next.price_cents, 2400);

    let snapshot = waitlist.counter_snapshot().await.expect("snapshot");
    assert_eq!(snapshot.total_signups, 101);
    assert_eq!(snapshot.tier, 2);
    assert_eq!(snapshot.spots_remaining_in_tier, Some(99));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_signups_fill_dense_range() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");

    let mut handles = Vec::new();
    for i in 0..64 {
        let waitlist = waitlist.clone();
        handles.push(tokio::spawn(async move {
            waitlist
                .signup(identity(&format!("rush{i}@example.com"), "Rush"))
                .await
                .expect("signup")
                .position
        }));
    }

    let mut positions = Vec::new();
    for handle in handles {
        positions.push(handle.await.expect("join"));
    }
    positions.sort_unstable();
    assert_eq!(positions, (1..=64).collect::<Vec<u64>>());

    let (last_position, entrants) = waitlist.queue_depth().await.expect("depth");
    assert_eq!(last_position, 64);
    assert_eq!(entrants, 64);
}

#[tokio::test]
async fn invalid_email_takes_no_position() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");

    let err = waitlist
        .signup(identity("not-an-email", "Nope"))
        .await
        .expect_err("invalid email");
    assert!(matches!(err, WaitlistError::InvalidEmail));
    assert!(!err.is_retryable());

    let receipt = waitlist
        .signup(identity("ok@example.com", "Ok"))
        .await
        .expect("signup");
    assert_eq!(receipt.position, 1);
}

#[tokio::test]
async fn queue_lists_in_position_order() {
    let (waitlist, _) = waitlist(Rewards::default()).expect("waitlist");
    for i in 0..5 {
        waitlist
            .signup(identity(&format!("q{i}@example.com"), "Q"))
            .await
            .expect("signup");
    }

    let page = waitlist.list_queue(1, 3).await.expect("list");
    let positions: Vec<u64> = page.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![2, 3, 4]);
}
