//! Decision records

use sqlx::SqlitePool;

use super::models::{Decision, Discussion};
use super::new_id;
use crate::consensus::Consensus;
use crate::{time, Error, Result};

const DECISION_COLUMNS: &str = "id, project_id, discussion_id, title, summary, consensus_score, \
                                clinical_agreement, industry_agreement, decided_at";

/// Record a decision for a discussion unless one already exists
///
/// Returns `Some(decision)` only when a new record was created.
pub async fn record_decision(
    pool: &SqlitePool,
    discussion: &Discussion,
    consensus: &Consensus,
) -> Result<Option<Decision>> {
    let id = new_id();

    let result = sqlx::query(
        r#"
        INSERT INTO decisions (id, project_id, discussion_id, title, summary, consensus_score,
                               clinical_agreement, industry_agreement, decided_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(discussion_id) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(&discussion.project_id)
    .bind(&discussion.id)
    .bind(&discussion.title)
    .bind(&discussion.content)
    .bind(consensus.score)
    .bind(consensus.clinical_agreement)
    .bind(consensus.industry_agreement)
    .bind(time::now_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_decision(pool, &id).await.map(Some)
}

pub async fn get_decision(pool: &SqlitePool, id: &str) -> Result<Decision> {
    sqlx::query_as::<_, Decision>(&format!(
        "SELECT {} FROM decisions WHERE id = ?",
        DECISION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Decision {}", id)))
}

pub async fn find_for_discussion(
    pool: &SqlitePool,
    discussion_id: &str,
) -> Result<Option<Decision>> {
    let decision = sqlx::query_as::<_, Decision>(&format!(
        "SELECT {} FROM decisions WHERE discussion_id = ?",
        DECISION_COLUMNS
    ))
    .bind(discussion_id)
    .fetch_optional(pool)
    .await?;

    Ok(decision)
}

/// Project decisions, newest first
pub async fn list_decisions(pool: &SqlitePool, project_id: &str) -> Result<Vec<Decision>> {
    let decisions = sqlx::query_as::<_, Decision>(&format!(
        "SELECT {} FROM decisions WHERE project_id = ? ORDER BY decided_at DESC",
        DECISION_COLUMNS
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(decisions)
}
