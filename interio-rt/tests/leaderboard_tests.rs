//! Integration tests for the leaderboard view

mod helpers;

use helpers::*;
use interio_common::db::models::ProfileGroup;
use interio_common::db::users;
use interio_rt::config::LeaderboardConfig;
use interio_rt::models::{LeaderboardOrder, ModerationOutcome, Verdict};

/// Seeded ranking:
///
/// | subject | group    | +  | -  |
/// |---------|----------|----|----|
/// | a       | designer | 2  | 0  |
/// | b       | supplier | 2  | 1  |
/// | c       | designer | 0  | 0  |
/// | d       | repair   | 2  | 0  |
struct Seeded {
    env: TestEnv,
    a: i64,
    b: i64,
    c: i64,
    d: i64,
}

async fn seed(leaderboard: LeaderboardConfig) -> Seeded {
    let env = create_test_env_with(leaderboard).await;
    let admin = seed_admin(&env.pool, "+70000000000").await;

    let a = seed_member(&env.pool, "+70000000001", "Alpha Interiors", ProfileGroup::Designer).await;
    let b = seed_member(&env.pool, "+70000000002", "Beta Supply", ProfileGroup::Supplier).await;
    let c = seed_member(&env.pool, "+70000000003", "Gamma Studio", ProfileGroup::Designer).await;
    let d = seed_member(&env.pool, "+70000000004", "Delta Repair", ProfileGroup::Repair).await;

    let r1 = seed_user(&env.pool, "+70000000011").await;
    let r2 = seed_user(&env.pool, "+70000000012").await;
    let r3 = seed_user(&env.pool, "+70000000013").await;

    for (author, subject, verdict) in [
        (r1, a, Verdict::Positive),
        (r2, a, Verdict::Positive),
        (r1, b, Verdict::Positive),
        (r2, b, Verdict::Positive),
        (r3, b, Verdict::Negative),
        (r1, d, Verdict::Positive),
        (r2, d, Verdict::Positive),
    ] {
        submit_and_decide(&env, author, subject, verdict, ModerationOutcome::Approved, admin).await;
    }
    // Pending and rejected reviews do not move anyone
    submit_and_decide(&env, r3, c, Verdict::Positive, ModerationOutcome::Rejected, admin).await;

    Seeded { env, a, b, c, d }
}

#[tokio::test]
async fn test_positive_order_with_tie_breaks() {
    let s = seed(LeaderboardConfig::default()).await;
    let page = s.env.state.leaderboard.top(None, None, None).await.unwrap();

    let order: Vec<i64> = page.entries.iter().map(|e| e.subject_id).collect();
    // a and d tie on counts; lower subject id wins
    assert_eq!(order, vec![s.a, s.d, s.b, s.c]);
    assert_eq!(page.total, 4);
    assert_eq!(page.limit, 50);
    assert_eq!(page.offset, 0);
    assert_eq!(page.order, LeaderboardOrder::Positive);

    let ranks: Vec<i64> = page.entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);

    let b = &page.entries[2];
    assert_eq!(b.display_name, "Beta Supply");
    assert_eq!(b.group, ProfileGroup::Supplier);
    assert_eq!((b.positive_count, b.negative_count, b.total_count), (2, 1, 3));
}

#[tokio::test]
async fn test_total_order() {
    let config = LeaderboardConfig {
        order: LeaderboardOrder::Total,
        ..Default::default()
    };
    let s = seed(config).await;
    let page = s.env.state.leaderboard.top(None, None, None).await.unwrap();

    let order: Vec<i64> = page.entries.iter().map(|e| e.subject_id).collect();
    assert_eq!(order, vec![s.b, s.a, s.d, s.c]);
    assert_eq!(page.order, LeaderboardOrder::Total);
}

#[tokio::test]
async fn test_ordering_is_deterministic() {
    let s = seed(LeaderboardConfig::default()).await;
    let first = s.env.state.leaderboard.top(None, None, None).await.unwrap();
    for _ in 0..5 {
        let again = s.env.state.leaderboard.top(None, None, None).await.unwrap();
        assert_eq!(again.entries, first.entries);
    }
}

#[tokio::test]
async fn test_pagination_and_ranks() {
    let s = seed(LeaderboardConfig::default()).await;

    let page = s.env.state.leaderboard.top(Some(2), Some(1), None).await.unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].subject_id, s.d);
    assert_eq!(page.entries[0].rank, 2);
    assert_eq!(page.entries[1].rank, 3);

    // Out-of-range values are clamped rather than rejected
    let page = s.env.state.leaderboard.top(Some(0), Some(-5), None).await.unwrap();
    assert_eq!(page.limit, 1);
    assert_eq!(page.offset, 0);
    assert_eq!(page.entries.len(), 1);

    let page = s.env.state.leaderboard.top(Some(10_000), None, None).await.unwrap();
    assert_eq!(page.limit, 100);

    let page = s.env.state.leaderboard.top(None, Some(50), None).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.total, 4);
}

#[tokio::test]
async fn test_group_filter() {
    let s = seed(LeaderboardConfig::default()).await;
    let page = s
        .env
        .state
        .leaderboard
        .top(None, None, Some(ProfileGroup::Designer))
        .await
        .unwrap();

    let order: Vec<i64> = page.entries.iter().map(|e| e.subject_id).collect();
    assert_eq!(order, vec![s.a, s.c]);
    assert_eq!(page.total, 2);

    let media = s
        .env
        .state
        .leaderboard
        .top(None, None, Some(ProfileGroup::Media))
        .await
        .unwrap();
    assert_eq!(media.total, 0);
    assert!(media.entries.is_empty());
}

#[tokio::test]
async fn test_unpublished_profiles_are_hidden() {
    let s = seed(LeaderboardConfig::default()).await;
    users::upsert_profile(&s.env.pool, s.a, "Alpha Interiors", ProfileGroup::Designer, false)
        .await
        .unwrap();

    let page = s.env.state.leaderboard.top(None, None, None).await.unwrap();
    let order: Vec<i64> = page.entries.iter().map(|e| e.subject_id).collect();
    assert_eq!(order, vec![s.d, s.b, s.c]);
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_configured_default_limit() {
    let config = LeaderboardConfig {
        default_limit: 2,
        max_limit: 3,
        ..Default::default()
    };
    let s = seed(config).await;

    let page = s.env.state.leaderboard.top(None, None, None).await.unwrap();
    assert_eq!(page.limit, 2);
    assert_eq!(page.entries.len(), 2);

    let page = s.env.state.leaderboard.top(Some(50), None, None).await.unwrap();
    assert_eq!(page.limit, 3);
}
