//! Discussion queries

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::models::{Discussion, DiscussionStatus, DiscussionType};
use super::new_id;
use crate::consensus::ConsensusStatus;
use crate::{time, Error, Result};

const DISCUSSION_SELECT: &str = r#"
    SELECT d.id, d.project_id, d.author_id, u.name AS author_name, d.title, d.content,
           d.discussion_type, d.status, d.consensus_status, d.created_at, d.updated_at
    FROM discussions d
    JOIN users u ON u.id = d.author_id
"#;

/// Sort order for discussion listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionSort {
    /// Most recently active first
    #[default]
    Recent,
    Oldest,
    /// Highest consensus first, then most recent
    Consensus,
}

impl DiscussionSort {
    fn order_by(&self) -> &'static str {
        match self {
            DiscussionSort::Recent => "d.updated_at DESC, d.created_at DESC",
            DiscussionSort::Oldest => "d.created_at ASC",
            DiscussionSort::Consensus => {
                "CASE d.consensus_status WHEN 'high' THEN 0 WHEN 'medium' THEN 1 \
                 WHEN 'low' THEN 2 ELSE 3 END, d.updated_at DESC"
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscussionFilter {
    pub discussion_type: Option<DiscussionType>,
    pub status: Option<DiscussionStatus>,
    pub sort: DiscussionSort,
}

/// Per-discussion activity counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiscussionCounts {
    pub comment_count: i64,
    pub evidence_count: i64,
    pub vote_count: i64,
}

pub async fn create_discussion(
    pool: &SqlitePool,
    project_id: &str,
    author_id: &str,
    title: &str,
    content: &str,
    discussion_type: DiscussionType,
) -> Result<Discussion> {
    let id = new_id();
    let now = time::now_string();

    sqlx::query(
        r#"
        INSERT INTO discussions (id, project_id, author_id, title, content, discussion_type,
                                 status, consensus_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'open', 'pending', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(author_id)
    .bind(title)
    .bind(content)
    .bind(discussion_type)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_discussion(pool, &id).await
}

pub async fn get_discussion(pool: &SqlitePool, id: &str) -> Result<Discussion> {
    sqlx::query_as::<_, Discussion>(&format!("{} WHERE d.id = ?", DISCUSSION_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Discussion {}", id)))
}

pub async fn list_discussions(
    pool: &SqlitePool,
    project_id: &str,
    filter: &DiscussionFilter,
) -> Result<Vec<Discussion>> {
    let sql = format!(
        r#"{}
        WHERE d.project_id = ?
          AND (? IS NULL OR d.discussion_type = ?)
          AND (? IS NULL OR d.status = ?)
        ORDER BY {}
        "#,
        DISCUSSION_SELECT,
        filter.sort.order_by()
    );

    let discussions = sqlx::query_as::<_, Discussion>(&sql)
        .bind(project_id)
        .bind(filter.discussion_type)
        .bind(filter.discussion_type)
        .bind(filter.status)
        .bind(filter.status)
        .fetch_all(pool)
        .await?;

    Ok(discussions)
}

/// Update title, content and/or status; `None` leaves a field unchanged
pub async fn update_discussion(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    status: Option<DiscussionStatus>,
) -> Result<Discussion> {
    let result = sqlx::query(
        r#"
        UPDATE discussions
        SET title = COALESCE(?, title),
            content = COALESCE(?, content),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(status)
    .bind(time::now_string())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Discussion {}", id)));
    }

    get_discussion(pool, id).await
}

/// Store a recomputed consensus status
///
/// Leaves `updated_at` alone: a team change recomputes every discussion in
/// the project and must not reorder the `recent` listing. Vote handlers call
/// [`touch`] themselves.
pub async fn set_consensus_status(
    pool: &SqlitePool,
    id: &str,
    status: ConsensusStatus,
) -> Result<()> {
    sqlx::query("UPDATE discussions SET consensus_status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Bump `updated_at` after a vote, comment or evidence link
pub async fn touch(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE discussions SET updated_at = ? WHERE id = ?")
        .bind(time::now_string())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn counts(pool: &SqlitePool, id: &str) -> Result<DiscussionCounts> {
    let counts = sqlx::query_as::<_, DiscussionCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM comments WHERE discussion_id = ?) AS comment_count,
            (SELECT COUNT(*) FROM evidence_links WHERE discussion_id = ?) AS evidence_count,
            (SELECT COUNT(*)
             FROM discussion_votes v
             JOIN discussions d ON d.id = v.discussion_id
             JOIN project_team t ON t.project_id = d.project_id AND t.user_id = v.user_id
             WHERE v.discussion_id = ? AND t.role != 'observer') AS vote_count
        "#,
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
