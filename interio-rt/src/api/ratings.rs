//! Rating and leaderboard endpoints

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, put},
    Json, Router,
};
use interio_common::api::Principal;
use interio_common::db::models::ProfileGroup;
use serde::Deserialize;

use super::reviews::{query_params, PageQuery, ReviewListResponse};
use crate::models::{LeaderboardPage, Rating};
use crate::pagination::{calculate_pagination, DEFAULT_LIMIT, MAX_LIMIT};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub group: Option<String>,
}

fn subject_path(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("User not found".to_string()))
}

/// PUT|POST /ratings/recalculate/:user_id/
///
/// Admin only. Rebuilds the subject's counters from approved reviews.
pub async fn recalculate(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Rating>> {
    let admin = principal.admin_capability()?;
    let rating = state.aggregator.recalc(subject_path(path)?, &admin).await?;
    Ok(Json(rating))
}

/// GET /ratings/user/:user_id/
pub async fn user_rating(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Rating>> {
    let rating = state.aggregator.get_rating(subject_path(path)?).await?;
    Ok(Json(rating))
}

/// GET /ratings/user/:user_id/reviews/
pub async fn user_reviews(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ReviewListResponse>> {
    let subject_id = subject_path(path)?;
    let query = query_params(query)?;
    let page = calculate_pagination(query.limit, query.offset, DEFAULT_LIMIT, MAX_LIMIT);

    let (items, total) = state
        .reviews
        .approved_for_subject(subject_id, page.limit, page.offset)
        .await?;

    Ok(Json(ReviewListResponse {
        total,
        limit: page.limit,
        offset: page.offset,
        items,
    }))
}

/// GET /ratings/leaderboard/?limit=&offset=&group=
pub async fn leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Json<LeaderboardPage>> {
    let query = query_params(query)?;
    let group = query
        .group
        .as_deref()
        .filter(|g| !g.is_empty())
        .map(str::parse::<ProfileGroup>)
        .transpose()?;

    let page = state.leaderboard.top(query.limit, query.offset, group).await?;
    Ok(Json(page))
}

/// Build rating routes
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ratings/recalculate/:user_id/",
            put(recalculate).post(recalculate),
        )
        .route("/ratings/user/:user_id/", get(user_rating))
        .route("/ratings/user/:user_id/reviews/", get(user_reviews))
        .route("/ratings/leaderboard/", get(leaderboard))
}
