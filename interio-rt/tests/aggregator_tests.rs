//! Integration tests for rating aggregation, moderation and review lifecycle
//!
//! Every test checks the stored counters against what a full recompute of
//! the approved subset would produce.

mod helpers;

use helpers::*;
use interio_common::db::models::ProfileGroup;
use interio_common::Error;
use interio_rt::models::{ModerationOutcome, ReviewStatus, Sign, Verdict};
use interio_rt::services::ReviewChanges;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

// =============================================================================
// Recompute
// =============================================================================

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio One", ProfileGroup::Designer).await;
    let a = seed_user(&env.pool, "+70000000002").await;
    let b = seed_user(&env.pool, "+70000000003").await;

    submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Approved, admin).await;
    submit_and_decide(&env, b, subject, Verdict::Negative, ModerationOutcome::Approved, admin).await;

    let first = env.state.aggregator.recompute(subject).await.unwrap();
    let second = env.state.aggregator.recompute(subject).await.unwrap();

    assert_eq!(first.counters(), (1, 1));
    assert_eq!(first.counters(), second.counters());
    assert!(second.last_recomputed_at.is_some());
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 1));
}

#[tokio::test]
async fn test_subject_without_reviews_reads_as_zero() {
    let env = create_test_env().await;
    let subject = seed_member(&env.pool, "+70000000001", "Quiet Studio", ProfileGroup::Media).await;

    let rating = env.state.aggregator.get_rating(subject).await.unwrap();
    assert_eq!(rating.counters(), (0, 0));
    assert!(rating.last_recomputed_at.is_none());
}

#[tokio::test]
async fn test_subject_without_profile_is_not_found() {
    let env = create_test_env().await;
    let no_profile = seed_user(&env.pool, "+70000000001").await;

    assert!(matches!(
        env.state.aggregator.recompute(no_profile).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        env.state.aggregator.apply_delta(no_profile, Verdict::Positive, Sign::Plus).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        env.state.aggregator.get_rating(9999).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_recompute_all_repairs_drift() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let s1 = seed_member(&env.pool, "+70000000001", "One", ProfileGroup::Designer).await;
    let s2 = seed_member(&env.pool, "+70000000002", "Two", ProfileGroup::Supplier).await;
    let author = seed_user(&env.pool, "+70000000003").await;

    submit_and_decide(&env, author, s1, Verdict::Positive, ModerationOutcome::Approved, admin).await;

    // Corrupt the projection behind the aggregator's back
    sqlx::query("UPDATE ratings SET positive_count = 42, negative_count = 7 WHERE subject_id = ?")
        .bind(s1)
        .execute(&env.pool)
        .await
        .unwrap();

    let processed = env.state.aggregator.recompute_all().await.unwrap();
    assert_eq!(processed, 2);
    assert_eq!(stored_counts(&env.pool, s1).await, (1, 0));
    assert_eq!(stored_counts(&env.pool, s2).await, (0, 0));
}

// =============================================================================
// Moderation
// =============================================================================

#[tokio::test]
async fn test_pending_reviews_never_count() {
    let env = create_test_env().await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;

    for i in 0..5 {
        let author = seed_user(&env.pool, &format!("+7100000000{}", i)).await;
        let p = principal(&env.pool, author).await;
        env.state
            .reviews
            .submit(&p, subject, Verdict::Positive, "Great work")
            .await
            .unwrap();
    }

    let rating = env.state.aggregator.recompute(subject).await.unwrap();
    assert_eq!(rating.counters(), (0, 0));
}

#[tokio::test]
async fn test_approving_positive_and_negative() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Repair).await;
    let a = seed_user(&env.pool, "+70000000002").await;
    let b = seed_user(&env.pool, "+70000000003").await;

    submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Approved, admin).await;
    submit_and_decide(&env, b, subject, Verdict::Negative, ModerationOutcome::Approved, admin).await;

    let rating = env.state.aggregator.get_rating(subject).await.unwrap();
    assert_eq!(rating.counters(), (1, 1));
    assert_eq!(rating.total_count(), 2);
}

#[tokio::test]
async fn test_rejected_reviews_never_count() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Repair).await;
    let a = seed_user(&env.pool, "+70000000002").await;

    let review =
        submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Rejected, admin)
            .await;

    assert_eq!(review.status, ReviewStatus::Rejected);
    assert_eq!(review.moderated_by, Some(admin));
    assert!(review.moderated_at.is_some());
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 0));
}

#[tokio::test]
async fn test_decide_only_from_pending() {
    let env = create_test_env().await;
    let admin_id = seed_admin(&env.pool, "+70000000000").await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let a = seed_user(&env.pool, "+70000000002").await;
    let b = seed_user(&env.pool, "+70000000003").await;

    let approved =
        submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Approved, admin_id)
            .await;
    let rejected =
        submit_and_decide(&env, b, subject, Verdict::Positive, ModerationOutcome::Rejected, admin_id)
            .await;

    // Approving twice must not double count
    let again = env
        .state
        .moderation
        .decide(approved.id, ModerationOutcome::Approved, &admin)
        .await;
    assert!(matches!(again, Err(Error::InvalidState(_))));

    // Rejected is final for moderation
    let revive = env
        .state
        .moderation
        .decide(rejected.id, ModerationOutcome::Approved, &admin)
        .await;
    assert!(matches!(revive, Err(Error::InvalidState(_))));

    let unknown = env
        .state
        .moderation
        .decide(Uuid::new_v4(), ModerationOutcome::Approved, &admin)
        .await;
    assert!(matches!(unknown, Err(Error::NotFound(_))));

    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));
}

#[tokio::test]
async fn test_pending_queue_oldest_first() {
    let env = create_test_env().await;
    let admin_id = seed_admin(&env.pool, "+70000000000").await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;

    let mut submitted = Vec::new();
    for i in 0..3 {
        let author = seed_user(&env.pool, &format!("+7100000000{}", i)).await;
        let p = principal(&env.pool, author).await;
        let (review, _) = env
            .state
            .reviews
            .submit(&p, subject, Verdict::Negative, "Delivery was late")
            .await
            .unwrap();
        submitted.push(review.id);
    }

    let (queue, total) = env.state.moderation.pending_queue(10, 0, &admin).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(queue.iter().map(|r| r.id).collect::<Vec<_>>(), submitted);

    let (page, _) = env.state.moderation.pending_queue(1, 1, &admin).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, submitted[1]);
}

// =============================================================================
// Review lifecycle
// =============================================================================

#[tokio::test]
async fn test_submit_validation() {
    let env = create_test_env().await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;
    let no_profile = seed_user(&env.pool, "+70000000003").await;

    let me = principal(&env.pool, subject).await;
    let p = principal(&env.pool, author).await;

    assert!(matches!(
        env.state.reviews.submit(&me, subject, Verdict::Positive, "I am great").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        env.state.reviews.submit(&p, subject, Verdict::Positive, "   ").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        env.state.reviews.submit(&p, no_profile, Verdict::Positive, "Fine").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_resubmit_revises_existing_review() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;

    let approved =
        submit_and_decide(&env, author, subject, Verdict::Positive, ModerationOutcome::Approved, admin)
            .await;
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));

    let p = principal(&env.pool, author).await;
    let (revised, created) = env
        .state
        .reviews
        .submit(&p, subject, Verdict::Negative, "Changed my mind")
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(revised.id, approved.id);
    assert_eq!(revised.status, ReviewStatus::Pending);
    assert_eq!(revised.verdict, Verdict::Negative);
    assert!(revised.moderated_by.is_none());
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 0));
}

#[tokio::test]
async fn test_revise_rules() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let other_subject = seed_member(&env.pool, "+70000000004", "Other", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;
    let stranger = seed_user(&env.pool, "+70000000003").await;

    let review =
        submit_and_decide(&env, author, subject, Verdict::Positive, ModerationOutcome::Approved, admin)
            .await;

    let author_p = principal(&env.pool, author).await;
    let stranger_p = principal(&env.pool, stranger).await;
    let admin_p = principal(&env.pool, admin).await;

    let body_only = ReviewChanges {
        body: Some("Updated text".to_string()),
        ..Default::default()
    };

    // Only the author may revise, admins included
    for p in [&stranger_p, &admin_p] {
        assert!(matches!(
            env.state.reviews.revise(p, review.id, body_only.clone(), false).await,
            Err(Error::PermissionDenied(_))
        ));
    }

    // Full update needs every field and the same subject
    assert!(matches!(
        env.state.reviews.revise(&author_p, review.id, body_only.clone(), true).await,
        Err(Error::InvalidInput(_))
    ));
    let moved = ReviewChanges {
        subject_id: Some(other_subject),
        verdict: Some(Verdict::Positive),
        body: Some("Moved".to_string()),
    };
    assert!(matches!(
        env.state.reviews.revise(&author_p, review.id, moved, true).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));

    // Partial update keeps the verdict and returns to moderation
    let revised = env
        .state
        .reviews
        .revise(&author_p, review.id, body_only, false)
        .await
        .unwrap();
    assert_eq!(revised.body, "Updated text");
    assert_eq!(revised.verdict, Verdict::Positive);
    assert_eq!(revised.status, ReviewStatus::Pending);
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 0));
}

#[tokio::test]
async fn test_rejected_review_can_reenter_moderation_by_revision() {
    let env = create_test_env().await;
    let admin_id = seed_admin(&env.pool, "+70000000000").await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;

    let review =
        submit_and_decide(&env, author, subject, Verdict::Negative, ModerationOutcome::Rejected, admin_id)
            .await;

    let p = principal(&env.pool, author).await;
    let changes = ReviewChanges {
        body: Some("Rewritten constructively".to_string()),
        ..Default::default()
    };
    env.state.reviews.revise(&p, review.id, changes, false).await.unwrap();

    let approved = env
        .state
        .moderation
        .decide(review.id, ModerationOutcome::Approved, &admin)
        .await
        .unwrap();
    assert_eq!(approved.status, ReviewStatus::Approved);
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 1));
}

#[tokio::test]
async fn test_delete_approved_decrements_by_one() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let a = seed_user(&env.pool, "+70000000002").await;
    let b = seed_user(&env.pool, "+70000000003").await;

    let first =
        submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Approved, admin).await;
    submit_and_decide(&env, b, subject, Verdict::Positive, ModerationOutcome::Approved, admin).await;
    assert_eq!(stored_counts(&env.pool, subject).await, (2, 0));

    let p = principal(&env.pool, a).await;
    env.state.reviews.delete(&p, first.id).await.unwrap();
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));

    assert!(matches!(
        env.state.reviews.delete(&p, first.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_permissions() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;

    let review =
        submit_and_decide(&env, author, subject, Verdict::Negative, ModerationOutcome::Approved, admin)
            .await;

    // The subject of a review cannot remove it
    let subject_p = principal(&env.pool, subject).await;
    assert!(matches!(
        env.state.reviews.delete(&subject_p, review.id).await,
        Err(Error::PermissionDenied(_))
    ));

    let admin_p = principal(&env.pool, admin).await;
    env.state.reviews.delete(&admin_p, review.id).await.unwrap();
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 0));
}

#[tokio::test]
async fn test_author_removal_cannot_bypass_counters() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;

    let review =
        submit_and_decide(&env, author, subject, Verdict::Positive, ModerationOutcome::Approved, admin)
            .await;
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));

    let removed = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(author)
        .execute(&env.pool)
        .await;
    assert!(removed.is_err(), "author with reviews must not be deletable");
    assert_eq!(stored_counts(&env.pool, subject).await, (1, 0));
    assert_eq!(
        stored_counts(&env.pool, subject).await,
        expected_counts(&env.pool, subject).await
    );

    // Once the review goes through the delete path the author can be removed
    let p = principal(&env.pool, author).await;
    env.state.reviews.delete(&p, review.id).await.unwrap();
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(author)
        .execute(&env.pool)
        .await
        .unwrap();
    assert_eq!(stored_counts(&env.pool, subject).await, (0, 0));
    assert_eq!(expected_counts(&env.pool, subject).await, (0, 0));
}

#[tokio::test]
async fn test_subject_removal_drops_reviews_and_rating() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let author = seed_user(&env.pool, "+70000000002").await;

    submit_and_decide(&env, author, subject, Verdict::Positive, ModerationOutcome::Approved, admin)
        .await;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(subject)
        .execute(&env.pool)
        .await
        .unwrap();

    let reviews_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE subject_id = ?")
        .bind(subject)
        .fetch_one(&env.pool)
        .await
        .unwrap();
    let ratings_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE subject_id = ?")
        .bind(subject)
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!((reviews_left, ratings_left), (0, 0));
}

#[tokio::test]
async fn test_decrement_saturates_at_zero() {
    let env = create_test_env().await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;

    let rating = env
        .state
        .aggregator
        .apply_delta(subject, Verdict::Positive, Sign::Minus)
        .await
        .unwrap();
    assert_eq!(rating.counters(), (0, 0));

    let rating = env
        .state
        .aggregator
        .apply_delta(subject, Verdict::Negative, Sign::Plus)
        .await
        .unwrap();
    assert_eq!(rating.counters(), (0, 1));
}

#[tokio::test]
async fn test_approved_for_subject_lists_only_approved() {
    let env = create_test_env().await;
    let admin = seed_admin(&env.pool, "+70000000000").await;
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;
    let a = seed_user(&env.pool, "+70000000002").await;
    let b = seed_user(&env.pool, "+70000000003").await;
    let c = seed_user(&env.pool, "+70000000004").await;

    let approved =
        submit_and_decide(&env, a, subject, Verdict::Positive, ModerationOutcome::Approved, admin).await;
    submit_and_decide(&env, b, subject, Verdict::Positive, ModerationOutcome::Rejected, admin).await;
    let p = principal(&env.pool, c).await;
    env.state
        .reviews
        .submit(&p, subject, Verdict::Negative, "Pending")
        .await
        .unwrap();

    let (items, total) = env
        .state
        .reviews
        .approved_for_subject(subject, 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, approved.id);
}

// =============================================================================
// Consistency
// =============================================================================

/// Random submit/approve/reject/revise/delete sequences keep the incremental
/// counters equal to a full recompute after every step.
#[tokio::test]
async fn test_random_operation_sequences_match_recompute() {
    let env = create_test_env().await;
    let admin_id = seed_admin(&env.pool, "+70000000000").await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;

    let mut authors = Vec::new();
    for i in 0..6 {
        let id = seed_user(&env.pool, &format!("+7200000000{}", i)).await;
        authors.push((principal(&env.pool, id).await, None::<Uuid>));
    }

    let mut rng = StdRng::seed_from_u64(0x5eed);

    for step in 0..200 {
        let slot = rng.gen_range(0..authors.len());
        let verdict = if rng.gen_bool(0.5) {
            Verdict::Positive
        } else {
            Verdict::Negative
        };
        let (author, review_id) = &mut authors[slot];

        let result = match (rng.gen_range(0..5), *review_id) {
            (0, _) | (_, None) => env
                .state
                .reviews
                .submit(author, subject, verdict, &format!("step {}", step))
                .await
                .map(|(r, _)| *review_id = Some(r.id)),
            (1, Some(id)) => env
                .state
                .moderation
                .decide(id, ModerationOutcome::Approved, &admin)
                .await
                .map(|_| ()),
            (2, Some(id)) => env
                .state
                .moderation
                .decide(id, ModerationOutcome::Rejected, &admin)
                .await
                .map(|_| ()),
            (3, Some(id)) => {
                let changes = ReviewChanges {
                    verdict: Some(verdict),
                    ..Default::default()
                };
                env.state
                    .reviews
                    .revise(author, id, changes, false)
                    .await
                    .map(|_| ())
            }
            (_, Some(id)) => env.state.reviews.delete(author, id).await.map(|_| {
                *review_id = None;
            }),
        };

        match result {
            Ok(()) | Err(Error::InvalidState(_)) => {}
            Err(e) => panic!("step {} failed unexpectedly: {}", step, e),
        }

        assert_eq!(
            stored_counts(&env.pool, subject).await,
            expected_counts(&env.pool, subject).await,
            "counters diverged from recompute at step {}",
            step
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_converge() {
    let env = create_test_env().await;
    let admin_id = seed_admin(&env.pool, "+70000000000").await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();
    let subject = seed_member(&env.pool, "+70000000001", "Studio", ProfileGroup::Designer).await;

    let mut review_ids = Vec::new();
    let mut positives = 0;
    for i in 0..20 {
        let author = seed_user(&env.pool, &format!("+730000000{:02}", i)).await;
        let p = principal(&env.pool, author).await;
        let verdict = if i % 3 == 0 {
            Verdict::Negative
        } else {
            positives += 1;
            Verdict::Positive
        };
        let (review, _) = env
            .state
            .reviews
            .submit(&p, subject, verdict, "Concurrent")
            .await
            .unwrap();
        review_ids.push(review.id);
    }

    let mut handles = Vec::new();
    for id in review_ids.clone() {
        let gate = env.state.moderation.clone();
        handles.push(tokio::spawn(async move {
            gate.decide(id, ModerationOutcome::Approved, &admin).await
        }));
    }
    // A second wave racing on the same reviews must all lose
    for id in review_ids {
        let gate = env.state.moderation.clone();
        handles.push(tokio::spawn(async move {
            gate.decide(id, ModerationOutcome::Approved, &admin).await
        }));
    }

    let mut approved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => approved += 1,
            Err(Error::InvalidState(_)) => {}
            Err(e) => panic!("unexpected moderation error: {}", e),
        }
    }

    assert_eq!(approved, 20);
    assert_eq!(stored_counts(&env.pool, subject).await, (positives, 20 - positives));

    let recomputed = env.state.aggregator.recompute(subject).await.unwrap();
    assert_eq!(recomputed.counters(), (positives, 20 - positives));
}
