//! User account queries

use super::models::{NewUser, User, UserSummary, UserUpdate};
use crate::password::{hash_password, verify_password};
use crate::roles::Role;
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, role, is_active, created_at, updated_at";

pub async fn find_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_active_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = ? AND is_active = 1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Check a username/password pair.
///
/// Returns `None` for an unknown username, an inactive account or a wrong
/// password. Callers must not distinguish between these cases.
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = find_active_user_by_username(pool, username).await? else {
        return Ok(None);
    };

    let hash = user.password_hash.clone();
    let candidate = password.to_string();
    let verified = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
        .await
        .unwrap_or(false);

    Ok(verified.then_some(user))
}

/// All users with the number of active projects each has created
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserSummary>> {
    let users = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username, u.email, u.full_name, u.role, u.is_active, u.created_at,
               COUNT(p.id) AS project_count
        FROM users u
        LEFT JOIN projects p ON p.created_by = u.id AND p.is_active = 1
        GROUP BY u.id
        ORDER BY u.created_at DESC, u.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Whether another user already holds `username` or `email`
pub async fn username_or_email_taken(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE (username = ? OR email = ?) AND id != ?",
    )
    .bind(username)
    .bind(email)
    .bind(exclude_id.unwrap_or(0))
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, full_name, password_hash, role, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.is_active)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Update a user's profile. Returns `false` when no such user exists.
pub async fn update_user(pool: &SqlitePool, id: i64, update: &UserUpdate) -> Result<bool> {
    let result = match &update.password_hash {
        Some(hash) => {
            sqlx::query(
                r#"
                UPDATE users
                SET username = ?, email = ?, full_name = ?, role = ?, is_active = ?,
                    password_hash = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&update.username)
            .bind(&update.email)
            .bind(&update.full_name)
            .bind(update.role)
            .bind(update.is_active)
            .bind(hash)
            .bind(id)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                UPDATE users
                SET username = ?, email = ?, full_name = ?, role = ?, is_active = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&update.username)
            .bind(&update.email)
            .bind(&update.full_name)
            .bind(update.role)
            .bind(update.is_active)
            .bind(id)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

/// Activate or deactivate an account (users are never hard-deleted)
pub async fn set_user_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET is_active = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(active)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Create the initial admin account when the users table is empty.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<bool> {
    if count_users(pool).await? > 0 {
        return Ok(false);
    }

    let owned = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&owned))
        .await
        .map_err(|e| crate::Error::Internal(e.to_string()))??;

    create_user(
        pool,
        &NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Administrator".to_string(),
            role: Role::Admin,
            password_hash,
            is_active: true,
        },
    )
    .await?;

    info!("Created bootstrap admin account '{}'", username);
    Ok(true)
}
