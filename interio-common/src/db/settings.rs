//! Key-value settings access

use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.flatten())
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
/// Returns the effective value.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<String> {
    // INSERT OR IGNORE handles concurrent initialization races
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value", key);
        return Ok(default_value.to_string());
    }

    match get_setting(pool, key).await? {
        Some(value) => Ok(value),
        None => {
            set_setting(pool, key, default_value).await?;
            info!("Reset NULL setting '{}' to default value", key);
            Ok(default_value.to_string())
        }
    }
}
