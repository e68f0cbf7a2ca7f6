//! Project activity log

use serde_json::Value;
use sqlx::SqlitePool;

use super::models::ActivityEntry;
use crate::{time, Result};

/// Default and maximum page size for activity listings
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
pub const MAX_ACTIVITY_LIMIT: i64 = 200;

/// One activity record to append
#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
    pub project_id: &'a str,
    pub user_id: Option<&'a str>,
    /// Verb, e.g. `created`, `voted`, `archived`
    pub action: &'a str,
    /// Entity kind, e.g. `project`, `discussion`, `comment`
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub details: Value,
}

pub async fn log_activity(pool: &SqlitePool, activity: NewActivity<'_>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_log (project_id, user_id, action, entity_type, entity_id, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(activity.project_id)
    .bind(activity.user_id)
    .bind(activity.action)
    .bind(activity.entity_type)
    .bind(activity.entity_id)
    .bind(activity.details.to_string())
    .bind(time::now_string())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent activity first; `limit` is clamped to `1..=MAX_ACTIVITY_LIMIT`
pub async fn list_activity(
    pool: &SqlitePool,
    project_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ActivityEntry>> {
    let limit = clamp_limit(limit);

    let entries = sqlx::query_as::<_, ActivityEntry>(
        r#"
        SELECT id, project_id, user_id, action, entity_type, entity_id, details, created_at
        FROM activity_log
        WHERE project_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}
