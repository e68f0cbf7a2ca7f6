//! Notification storage

use serde::Serialize;
use sqlx::SqlitePool;

use super::models::Notification;
use super::new_id;
use crate::notify::NotificationKind;
use crate::{time, Error, Result};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, project_id, kind, message, link, is_read, created_at";

/// Notification listing with the caller's unread total
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub async fn create_notification(
    pool: &SqlitePool,
    user_id: &str,
    project_id: Option<&str>,
    kind: NotificationKind,
    message: &str,
    link: Option<&str>,
) -> Result<Notification> {
    let notification = Notification {
        id: new_id(),
        user_id: user_id.to_string(),
        project_id: project_id.map(str::to_string),
        kind,
        message: message.to_string(),
        link: link.map(str::to_string),
        is_read: false,
        created_at: time::now_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, project_id, kind, message, link, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.project_id)
    .bind(notification.kind)
    .bind(&notification.message)
    .bind(&notification.link)
    .bind(&notification.created_at)
    .execute(pool)
    .await?;

    Ok(notification)
}

/// The user's notifications, newest first
pub async fn list_notifications(
    pool: &SqlitePool,
    user_id: &str,
    unread_only: bool,
) -> Result<NotificationPage> {
    let notifications = sqlx::query_as::<_, Notification>(&format!(
        r#"
        SELECT {} FROM notifications
        WHERE user_id = ? AND (NOT ? OR is_read = 0)
        ORDER BY created_at DESC, rowid DESC
        "#,
        NOTIFICATION_COLUMNS
    ))
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await?;

    Ok(NotificationPage {
        notifications,
        unread_count: unread_count(pool, user_id).await?,
    })
}

pub async fn unread_count(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Mark one of the user's notifications read
///
/// Another user's notification is reported as not found.
pub async fn mark_read(pool: &SqlitePool, user_id: &str, id: &str) -> Result<Notification> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Notification {}", id)));
    }

    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE id = ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(Error::from)
}

/// Mark every unread notification read, returning how many changed
pub async fn mark_all_read(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
