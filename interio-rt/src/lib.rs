//! interio-rt library - Ratings service
//!
//! Moderated reviews between community members and the ratings derived
//! from them. Exposed as a library for integration testing.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::config::LeaderboardConfig;
use crate::services::{Aggregator, Leaderboard, ModerationGate, ReviewService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared secret for bearer token verification
    pub shared_secret: i64,
    pub aggregator: Aggregator,
    pub moderation: ModerationGate,
    pub reviews: ReviewService,
    pub leaderboard: Leaderboard,
}

impl AppState {
    /// Create new application state. All services share one set of subject locks.
    pub fn new(
        db: SqlitePool,
        shared_secret: i64,
        max_lock_wait_ms: u64,
        leaderboard: LeaderboardConfig,
    ) -> Self {
        let aggregator = Aggregator::new(db.clone(), max_lock_wait_ms);
        Self {
            moderation: ModerationGate::new(aggregator.clone()),
            reviews: ReviewService::new(aggregator.clone()),
            leaderboard: Leaderboard::new(db.clone(), leaderboard),
            aggregator,
            db,
            shared_secret,
        }
    }
}

/// Build application router
///
/// Only `/health`, rating snapshots, public review lists and the leaderboard
/// are reachable without a bearer token.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::rating_routes())
        .merge(api::review_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
