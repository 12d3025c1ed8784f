//! Review and rating tables
//!
//! `reviews` is the source of truth. `ratings` is a projection over the
//! approved subset and can be rebuilt from `reviews` at any time.

use interio_common::Result;
use sqlx::SqlitePool;

pub async fn create_rating_tables(pool: &SqlitePool) -> Result<()> {
    create_reviews_table(pool).await?;
    create_ratings_table(pool).await?;
    Ok(())
}

/// Authors cannot be deleted while they still have reviews; those must go
/// through the review delete path so approved counters are decremented.
/// Removing a subject profile drops its reviews and its rating together.
async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            subject_id INTEGER NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            verdict TEXT NOT NULL CHECK (verdict IN ('positive', 'negative')),
            body TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            moderated_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            moderated_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (author_id, subject_id),
            CHECK (author_id <> subject_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reviews_subject_status ON reviews(subject_id, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_status_created ON reviews(status, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_ratings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ratings (
            subject_id INTEGER PRIMARY KEY REFERENCES profiles(user_id) ON DELETE CASCADE,
            positive_count INTEGER NOT NULL DEFAULT 0 CHECK (positive_count >= 0),
            negative_count INTEGER NOT NULL DEFAULT 0 CHECK (negative_count >= 0),
            last_recomputed_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
