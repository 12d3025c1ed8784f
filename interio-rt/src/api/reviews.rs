//! Review endpoints
//!
//! - `POST /ratings/reviews/` submit (201 new, 200 revised)
//! - `GET /ratings/reviews/pending/` moderation queue (admin)
//! - `GET|PUT|PATCH|DELETE /ratings/reviews/:id/` author/admin access
//! - `PATCH /ratings/reviews/:id/update-status/` moderation decision (admin)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use interio_common::api::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ModerationOutcome, Review, Verdict};
use crate::pagination::{calculate_pagination, DEFAULT_LIMIT, MAX_LIMIT};
use crate::services::ReviewChanges;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub subject_id: i64,
    pub verdict: Verdict,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paged list of reviews
#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub items: Vec<Review>,
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn review_id(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Review not found".to_string()))
}

/// POST /ratings/reviews/
pub async fn create_review(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let request = json_body(body)?;
    let (review, created) = state
        .reviews
        .submit(&principal, request.subject_id, request.verdict, &request.body)
        .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(review)))
}

/// GET /ratings/reviews/:id/
pub async fn get_review(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Review>> {
    let review = state.reviews.get(&principal, review_id(path)?).await?;
    Ok(Json(review))
}

/// PUT /ratings/reviews/:id/
pub async fn replace_review(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReviewChanges>, JsonRejection>,
) -> ApiResult<Json<Review>> {
    let id = review_id(path)?;
    let changes = json_body(body)?;
    let review = state.reviews.revise(&principal, id, changes, true).await?;
    Ok(Json(review))
}

/// PATCH /ratings/reviews/:id/
pub async fn update_review(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReviewChanges>, JsonRejection>,
) -> ApiResult<Json<Review>> {
    let id = review_id(path)?;
    let changes = json_body(body)?;
    let review = state.reviews.revise(&principal, id, changes, false).await?;
    Ok(Json(review))
}

/// DELETE /ratings/reviews/:id/
pub async fn delete_review(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    state.reviews.delete(&principal, review_id(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /ratings/reviews/:id/update-status/
///
/// **Request:** `{"status": "approved"}` or `{"status": "rejected"}`
pub async fn update_status(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Review>> {
    let admin = principal.admin_capability()?;
    let id = review_id(path)?;
    let outcome: ModerationOutcome = json_body(body)?.status.parse()?;

    let review = state.moderation.decide(id, outcome, &admin).await?;
    Ok(Json(review))
}

/// GET /ratings/reviews/pending/
pub async fn pending_reviews(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ReviewListResponse>> {
    let admin = principal.admin_capability()?;
    let query = query_params(query)?;
    let page = calculate_pagination(query.limit, query.offset, DEFAULT_LIMIT, MAX_LIMIT);

    let (items, total) = state
        .moderation
        .pending_queue(page.limit, page.offset, &admin)
        .await?;

    Ok(Json(ReviewListResponse {
        total,
        limit: page.limit,
        offset: page.offset,
        items,
    }))
}

/// Build review routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/ratings/reviews/", post(create_review))
        .route("/ratings/reviews/pending/", get(pending_reviews))
        .route(
            "/ratings/reviews/:id/",
            get(get_review)
                .put(replace_review)
                .patch(update_review)
                .delete(delete_review),
        )
        .route("/ratings/reviews/:id/update-status/", patch(update_status))
}
