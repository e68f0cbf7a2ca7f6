//! Bearer-token session storage

use sqlx::SqlitePool;
use tracing::debug;

use super::models::{Session, User};
use crate::{auth, time, Error, Result};

/// Create a session for `user_id` valid for `ttl_hours`
pub async fn create_session(pool: &SqlitePool, user_id: &str, ttl_hours: i64) -> Result<Session> {
    let session = Session {
        token: auth::generate_token(),
        user_id: user_id.to_string(),
        created_at: time::now_string(),
        expires_at: time::hours_from_now(ttl_hours)?,
    };

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(pool)
        .await?;

    Ok(session)
}

/// Resolve a token to its user
///
/// Unknown tokens and expired sessions are `Unauthorized`; an expired session
/// is deleted on lookup.
pub async fn user_for_token(pool: &SqlitePool, token: &str) -> Result<User> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::Unauthorized("Invalid session token".to_string()))?;

    if session.expires_at <= time::now_string() {
        debug!("Session for user {} expired at {}", session.user_id, session.expires_at);
        delete_session(pool, token).await?;
        return Err(Error::Unauthorized("Session expired".to_string()));
    }

    super::users::find_user(pool, &session.user_id)
        .await?
        .ok_or_else(|| Error::Unauthorized("Session user no longer exists".to_string()))
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove every expired session, returning how many were deleted
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(time::now_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
