//! Database access layer for interio-rt

use interio_common::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub mod ratings;
pub mod retry;
pub mod reviews;
pub mod schema;

pub use retry::retry_on_lock;

/// Open the database, creating shared and rating tables as needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = interio_common::db::init_database(db_path).await?;
    schema::create_rating_tables(&pool).await?;
    info!("Rating tables ready");
    Ok(pool)
}
