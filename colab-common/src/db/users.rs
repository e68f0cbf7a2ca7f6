//! User queries

use sqlx::SqlitePool;

use super::models::{User, UserCredentials};
use super::new_id;
use crate::auth::PasswordHash;
use crate::consensus::Side;
use crate::{time, Error, Result};

const USER_COLUMNS: &str = "id, email, name, user_type, created_at, updated_at";

/// Insert a new user; duplicate email is a `Conflict`
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    user_type: Side,
    password: &PasswordHash,
) -> Result<User> {
    let id = new_id();
    let now = time::now_string();

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, password_salt, user_type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(name)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(user_type)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(Error::from);

    match result {
        Ok(_) => {}
        Err(e) if e.is_unique_violation() => {
            return Err(Error::Conflict(format!("Email already registered: {}", email)));
        }
        Err(e) => return Err(e),
    }

    get_user(pool, &id).await
}

/// Fetch a user by id
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    find_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {}", id)))
}

pub async fn find_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Password material for login, looked up by email
pub async fn get_credentials_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserCredentials>> {
    let creds = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, password_hash, password_salt FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(creds)
}

/// Update display name and/or user type
pub async fn update_user(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    user_type: Option<Side>,
) -> Result<User> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            user_type = COALESCE(?, user_type),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(user_type)
    .bind(time::now_string())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }

    get_user(pool, id).await
}
