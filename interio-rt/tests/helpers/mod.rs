//! Test Helper Utilities
//!
//! Temp-file databases, seeded members and signed tokens shared by the
//! interio-rt integration tests.

#![allow(dead_code)]

use interio_common::api::{load_shared_secret, sign_token, Principal};
use interio_common::db::models::{ProfileGroup, Role};
use interio_common::db::users;
use interio_common::time;
use interio_rt::config::LeaderboardConfig;
use interio_rt::db::{ratings, reviews};
use interio_rt::models::{ModerationOutcome, Review, Verdict};
use interio_rt::AppState;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Test database plus a fully wired application state.
///
/// Keep the struct alive for the duration of the test: dropping it removes
/// the database directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub secret: i64,
    pub state: AppState,
}

pub async fn create_test_env() -> TestEnv {
    create_test_env_with(LeaderboardConfig::default()).await
}

pub async fn create_test_env_with(leaderboard: LeaderboardConfig) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let pool = interio_rt::db::init_database_pool(&dir.path().join("interio.db"))
        .await
        .expect("test database should initialize");
    let secret = load_shared_secret(&pool).await.unwrap();
    let state = AppState::new(pool.clone(), secret, 5000, leaderboard);

    TestEnv {
        dir,
        pool,
        secret,
        state,
    }
}

fn role_for(group: ProfileGroup) -> Role {
    match group {
        ProfileGroup::Designer => Role::Designer,
        ProfileGroup::Repair => Role::Repair,
        ProfileGroup::Supplier => Role::Supplier,
        ProfileGroup::Media => Role::Media,
    }
}

/// User without a profile (can author reviews, never ranked)
pub async fn seed_user(pool: &SqlitePool, phone: &str) -> i64 {
    users::insert_user(pool, phone, Role::Designer)
        .await
        .unwrap()
        .id
}

/// User with a published profile in `group`
pub async fn seed_member(pool: &SqlitePool, phone: &str, name: &str, group: ProfileGroup) -> i64 {
    let user = users::insert_user(pool, phone, role_for(group)).await.unwrap();
    users::upsert_profile(pool, user.id, name, group, true)
        .await
        .unwrap();
    user.id
}

pub async fn seed_admin(pool: &SqlitePool, phone: &str) -> i64 {
    users::insert_user(pool, phone, Role::Admin).await.unwrap().id
}

pub async fn principal(pool: &SqlitePool, user_id: i64) -> Principal {
    let user = users::get_user(pool, user_id).await.unwrap().unwrap();
    Principal::from_user(&user)
}

/// Token valid for one hour
pub fn token_for(user_id: i64, secret: i64) -> String {
    sign_token(user_id, time::now_millis() + 3_600_000, secret)
}

pub fn bearer(user_id: i64, secret: i64) -> String {
    format!("Bearer {}", token_for(user_id, secret))
}

/// Submit a review and moderate it in one step
pub async fn submit_and_decide(
    env: &TestEnv,
    author_id: i64,
    subject_id: i64,
    verdict: Verdict,
    outcome: ModerationOutcome,
    admin_id: i64,
) -> Review {
    let author = principal(&env.pool, author_id).await;
    let admin = principal(&env.pool, admin_id).await.admin_capability().unwrap();

    let (review, _) = env
        .state
        .reviews
        .submit(&author, subject_id, verdict, "Worked with them on a project")
        .await
        .unwrap();
    env.state
        .moderation
        .decide(review.id, outcome, &admin)
        .await
        .unwrap()
}

/// Counters as stored in the projection (zeros when there is no row)
pub async fn stored_counts(pool: &SqlitePool, subject_id: i64) -> (i64, i64) {
    ratings::get_rating(pool, subject_id)
        .await
        .unwrap()
        .map(|r| r.counters())
        .unwrap_or((0, 0))
}

/// Counters a full recompute would produce, without writing anything
pub async fn expected_counts(pool: &SqlitePool, subject_id: i64) -> (i64, i64) {
    reviews::count_approved_by_verdict(pool, subject_id)
        .await
        .unwrap()
}
