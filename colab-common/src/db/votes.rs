//! Discussion vote queries and consensus tally

use sqlx::SqlitePool;

use super::models::Vote;
use super::team;
use crate::consensus::{Side, TeamTally, VoteValue};
use crate::{time, Error, Result};

/// Cast or change a vote (one vote per user per discussion)
pub async fn upsert_vote(
    pool: &SqlitePool,
    discussion_id: &str,
    user_id: &str,
    vote: VoteValue,
) -> Result<Vote> {
    let now = time::now_string();

    sqlx::query(
        r#"
        INSERT INTO discussion_votes (discussion_id, user_id, vote, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(discussion_id, user_id) DO UPDATE SET
            vote = excluded.vote,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(discussion_id)
    .bind(user_id)
    .bind(vote)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_vote(pool, discussion_id, user_id)
        .await?
        .ok_or_else(|| Error::Internal("Vote vanished after upsert".to_string()))
}

pub async fn get_vote(
    pool: &SqlitePool,
    discussion_id: &str,
    user_id: &str,
) -> Result<Option<Vote>> {
    let vote = sqlx::query_as::<_, Vote>(
        r#"
        SELECT v.discussion_id, v.user_id, u.name AS user_name, v.vote, v.created_at, v.updated_at
        FROM discussion_votes v
        JOIN users u ON u.id = v.user_id
        WHERE v.discussion_id = ? AND v.user_id = ?
        "#,
    )
    .bind(discussion_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(vote)
}

/// Withdraw a vote; returns whether one existed
pub async fn delete_vote(pool: &SqlitePool, discussion_id: &str, user_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM discussion_votes WHERE discussion_id = ? AND user_id = ?")
        .bind(discussion_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Votes of current voting team members, oldest first
///
/// Matches the rows counted by [`tally`].
pub async fn list_votes(pool: &SqlitePool, discussion_id: &str) -> Result<Vec<Vote>> {
    let votes = sqlx::query_as::<_, Vote>(
        r#"
        SELECT v.discussion_id, v.user_id, u.name AS user_name, v.vote, v.created_at, v.updated_at
        FROM discussion_votes v
        JOIN users u ON u.id = v.user_id
        JOIN discussions d ON d.id = v.discussion_id
        JOIN project_team t ON t.project_id = d.project_id AND t.user_id = v.user_id
        WHERE v.discussion_id = ? AND t.role != 'observer'
        ORDER BY v.created_at
        "#,
    )
    .bind(discussion_id)
    .fetch_all(pool)
    .await?;

    Ok(votes)
}

/// Tally the votes of current voting team members
///
/// Votes left behind by users who were removed from the team or demoted to
/// observer are ignored, so no side can count more votes than members.
pub async fn tally(pool: &SqlitePool, project_id: &str, discussion_id: &str) -> Result<TeamTally> {
    let (clinical_team, industry_team) = team::voting_team_sizes(pool, project_id).await?;

    let votes: Vec<(Side, VoteValue)> = sqlx::query_as(
        r#"
        SELECT t.side, v.vote
        FROM discussion_votes v
        JOIN project_team t ON t.user_id = v.user_id AND t.project_id = ?
        WHERE v.discussion_id = ? AND t.role != 'observer'
        "#,
    )
    .bind(project_id)
    .bind(discussion_id)
    .fetch_all(pool)
    .await?;

    TeamTally::new(clinical_team, industry_team, votes)
}
