//! User and profile lookups
//!
//! The accounts service owns these tables; the functions that write them
//! exist for bootstrapping (admin creation) and for tests.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::models::{Profile, ProfileGroup, Role, User};
use crate::{time, Error, Result};

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        phone: row.get("phone"),
        role: role.parse()?,
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: time::from_db(&row.get::<String, _>("created_at"))?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    let group: String = row.get("group_name");
    Ok(Profile {
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        group: group.parse()?,
        published: row.get::<i64, _>("published") != 0,
        created_at: time::from_db(&row.get::<String, _>("created_at"))?,
    })
}

/// Insert a user and return it
pub async fn insert_user(pool: &SqlitePool, phone: &str, role: Role) -> Result<User> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(Error::InvalidInput("Phone must not be empty".to_string()));
    }

    let created_at = time::now();
    let id = sqlx::query(
        "INSERT INTO users (phone, role, is_active, created_at) VALUES (?, ?, 1, ?)",
    )
    .bind(phone)
    .bind(role.as_str())
    .bind(time::to_db(&created_at))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(User {
        id,
        phone: phone.to_string(),
        role,
        is_active: true,
        created_at,
    })
}

pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, phone, role, is_active, created_at FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_phone(pool: &SqlitePool, phone: &str) -> Result<Option<User>> {
    let row =
        sqlx::query("SELECT id, phone, role, is_active, created_at FROM users WHERE phone = ?")
            .bind(phone.trim())
            .fetch_optional(pool)
            .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Change a user's role (used when promoting an existing account to admin)
pub async fn set_user_role(pool: &SqlitePool, user_id: i64, role: Role) -> Result<()> {
    let affected = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(Error::NotFound(format!("User {}", user_id)));
    }
    Ok(())
}

pub async fn set_user_active(pool: &SqlitePool, user_id: i64, active: bool) -> Result<()> {
    let affected = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active as i64)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(Error::NotFound(format!("User {}", user_id)));
    }
    Ok(())
}

/// Create or replace the public profile for a user
pub async fn upsert_profile(
    pool: &SqlitePool,
    user_id: i64,
    display_name: &str,
    group: ProfileGroup,
    published: bool,
) -> Result<Profile> {
    let created_at = time::now();
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, display_name, group_name, published, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            display_name = excluded.display_name,
            group_name = excluded.group_name,
            published = excluded.published
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .bind(group.as_str())
    .bind(published as i64)
    .bind(time::to_db(&created_at))
    .execute(pool)
    .await?;

    get_profile(pool, user_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Profile {} vanished after upsert", user_id)))
}

pub async fn get_profile(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT user_id, display_name, group_name, published, created_at FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(profile_from_row).transpose()
}

/// Profile existence check usable inside an open transaction
pub async fn profile_exists(conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = ?)")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

/// IDs of every profile, ascending
pub async fn list_profile_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT user_id FROM profiles ORDER BY user_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
