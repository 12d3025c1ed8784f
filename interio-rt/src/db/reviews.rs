//! Review Store
//!
//! Query functions are generic over the executor so they run either on the
//! pool or inside an open transaction.

use chrono::{DateTime, Utc};
use interio_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use uuid::Uuid;

use crate::models::{Review, ReviewStatus, Verdict};

const REVIEW_COLUMNS: &str = "id, author_id, subject_id, verdict, body, status, \
     moderated_by, moderated_at, created_at, updated_at";

fn review_from_row(row: &SqliteRow) -> Result<Review> {
    let id: String = row.get("id");
    let verdict: String = row.get("verdict");
    let status: String = row.get("status");

    Ok(Review {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Invalid review id '{}': {}", id, e)))?,
        author_id: row.get("author_id"),
        subject_id: row.get("subject_id"),
        verdict: verdict.parse()?,
        body: row.get("body"),
        status: status.parse()?,
        moderated_by: row.get("moderated_by"),
        moderated_at: time::from_db_opt(row.get("moderated_at"))?,
        created_at: time::from_db(&row.get::<String, _>("created_at"))?,
        updated_at: time::from_db(&row.get::<String, _>("updated_at"))?,
    })
}

pub async fn insert_review<'e, E>(executor: E, review: &Review) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO reviews (
            id, author_id, subject_id, verdict, body, status,
            moderated_by, moderated_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(review.id.to_string())
    .bind(review.author_id)
    .bind(review.subject_id)
    .bind(review.verdict.as_str())
    .bind(&review.body)
    .bind(review.status.as_str())
    .bind(review.moderated_by)
    .bind(review.moderated_at.as_ref().map(time::to_db))
    .bind(time::to_db(&review.created_at))
    .bind(time::to_db(&review.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_review<'e, E>(executor: E, id: Uuid) -> Result<Option<Review>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(review_from_row).transpose()
}

pub async fn find_by_author_and_subject<'e, E>(
    executor: E,
    author_id: i64,
    subject_id: i64,
) -> Result<Option<Review>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM reviews WHERE author_id = ? AND subject_id = ?",
        REVIEW_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(author_id)
        .bind(subject_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(review_from_row).transpose()
}

/// Replace verdict and body and send the review back to moderation
pub async fn revise_content<'e, E>(
    executor: E,
    id: Uuid,
    verdict: Verdict,
    body: &str,
    updated_at: &DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let affected = sqlx::query(
        r#"
        UPDATE reviews
        SET verdict = ?, body = ?, status = 'pending',
            moderated_by = NULL, moderated_at = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(verdict.as_str())
    .bind(body)
    .bind(time::to_db(updated_at))
    .bind(id.to_string())
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected)
}

/// Move a review out of `pending`. Returns 0 if the review is missing or
/// has already been decided.
pub async fn decide_if_pending<'e, E>(
    executor: E,
    id: Uuid,
    status: ReviewStatus,
    moderator_id: i64,
    decided_at: &DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let decided_at = time::to_db(decided_at);
    let affected = sqlx::query(
        r#"
        UPDATE reviews
        SET status = ?, moderated_by = ?, moderated_at = ?, updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(moderator_id)
    .bind(&decided_at)
    .bind(&decided_at)
    .bind(id.to_string())
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected)
}

pub async fn delete_review<'e, E>(executor: E, id: Uuid) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let affected = sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(id.to_string())
        .execute(executor)
        .await?
        .rows_affected();
    Ok(affected)
}

/// Approved review counts for a subject as (positive, negative)
pub async fn count_approved_by_verdict<'e, E>(executor: E, subject_id: i64) -> Result<(i64, i64)>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN verdict = 'positive' THEN 1 ELSE 0 END), 0) AS positive,
            COALESCE(SUM(CASE WHEN verdict = 'negative' THEN 1 ELSE 0 END), 0) AS negative
        FROM reviews
        WHERE subject_id = ? AND status = 'approved'
        "#,
    )
    .bind(subject_id)
    .fetch_one(executor)
    .await?;

    Ok((row.get("positive"), row.get("negative")))
}

pub async fn count_with_status<'e, E>(executor: E, status: ReviewStatus) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Pending reviews, oldest first (moderation work queue)
pub async fn list_pending<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Review>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM reviews WHERE status = 'pending' \
         ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
        REVIEW_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

    rows.iter().map(review_from_row).collect()
}

pub async fn count_approved_for_subject<'e, E>(executor: E, subject_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews WHERE subject_id = ? AND status = 'approved'",
    )
    .bind(subject_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Approved reviews about a subject, newest first
pub async fn list_approved_for_subject<'e, E>(
    executor: E,
    subject_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Review>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM reviews WHERE subject_id = ? AND status = 'approved' \
         ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
        REVIEW_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(subject_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

    rows.iter().map(review_from_row).collect()
}
