//! Rating projection storage and leaderboard queries

use chrono::{DateTime, Utc};
use interio_common::db::models::ProfileGroup;
use interio_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::models::{LeaderboardEntry, LeaderboardOrder, Rating};

fn rating_from_row(row: &SqliteRow) -> Result<Rating> {
    Ok(Rating {
        subject_id: row.get("subject_id"),
        positive_count: row.get("positive_count"),
        negative_count: row.get("negative_count"),
        last_recomputed_at: time::from_db_opt(row.get("last_recomputed_at"))?,
        updated_at: time::from_db_opt(row.get("updated_at"))?,
    })
}

/// Make sure the subject's rating row exists (no-op when there is no profile).
///
/// Every counter-changing transaction runs this first: as a write it takes
/// the database write lock before any read happens in the transaction.
pub async fn touch<'e, E>(executor: E, subject_id: i64, now: &DateTime<Utc>) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO ratings (subject_id, positive_count, negative_count, last_recomputed_at, updated_at)
        SELECT ?, 0, 0, NULL, ?
        WHERE EXISTS (SELECT 1 FROM profiles WHERE user_id = ?)
        "#,
    )
    .bind(subject_id)
    .bind(time::to_db(now))
    .bind(subject_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_rating<'e, E>(executor: E, subject_id: i64) -> Result<Option<Rating>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT subject_id, positive_count, negative_count, last_recomputed_at, updated_at
        FROM ratings WHERE subject_id = ?
        "#,
    )
    .bind(subject_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(rating_from_row).transpose()
}

/// Write counters after an incremental update (leaves `last_recomputed_at` alone)
pub async fn store_incremental<'e, E>(
    executor: E,
    subject_id: i64,
    positive_count: i64,
    negative_count: i64,
    now: &DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE ratings SET positive_count = ?, negative_count = ?, updated_at = ? WHERE subject_id = ?",
    )
    .bind(positive_count)
    .bind(negative_count)
    .bind(time::to_db(now))
    .bind(subject_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrite both counters with freshly computed values
pub async fn store_recomputed<'e, E>(
    executor: E,
    subject_id: i64,
    positive_count: i64,
    negative_count: i64,
    now: &DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = time::to_db(now);
    sqlx::query(
        r#"
        UPDATE ratings
        SET positive_count = ?, negative_count = ?, last_recomputed_at = ?, updated_at = ?
        WHERE subject_id = ?
        "#,
    )
    .bind(positive_count)
    .bind(negative_count)
    .bind(&now)
    .bind(&now)
    .bind(subject_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Number of subjects eligible for the leaderboard
pub async fn count_ranked<'e, E>(executor: E, group: Option<ProfileGroup>) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM profiles WHERE published = 1 AND (? IS NULL OR group_name = ?)",
    )
    .bind(group.map(|g| g.as_str()))
    .bind(group.map(|g| g.as_str()))
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Ranked slice of published profiles joined with their counters
pub async fn leaderboard_slice<'e, E>(
    executor: E,
    order: LeaderboardOrder,
    group: Option<ProfileGroup>,
    limit: i64,
    offset: i64,
) -> Result<Vec<LeaderboardEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT subject_id, display_name, group_name, positive_count, negative_count
        FROM (
            SELECT p.user_id AS subject_id,
                   p.display_name AS display_name,
                   p.group_name AS group_name,
                   COALESCE(r.positive_count, 0) AS positive_count,
                   COALESCE(r.negative_count, 0) AS negative_count
            FROM profiles p
            LEFT JOIN ratings r ON r.subject_id = p.user_id
            WHERE p.published = 1 AND (? IS NULL OR p.group_name = ?)
        )
        ORDER BY {}
        LIMIT ? OFFSET ?
        "#,
        order.order_by_clause()
    );

    let rows = sqlx::query(&sql)
        .bind(group.map(|g| g.as_str()))
        .bind(group.map(|g| g.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

    rows.iter()
        .enumerate()
        .map(|(position, row)| {
            let group: String = row.get("group_name");
            let positive_count: i64 = row.get("positive_count");
            let negative_count: i64 = row.get("negative_count");
            Ok(LeaderboardEntry {
                rank: offset + position as i64 + 1,
                subject_id: row.get("subject_id"),
                display_name: row.get("display_name"),
                group: group.parse()?,
                positive_count,
                negative_count,
                total_count: positive_count + negative_count,
            })
        })
        .collect()
}
