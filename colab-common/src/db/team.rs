//! Project team membership queries

use sqlx::SqlitePool;

use super::models::{TeamMember, TeamRole};
use crate::consensus::Side;
use crate::{time, Error, Result};

const MEMBER_SELECT: &str = r#"
    SELECT t.project_id, t.user_id, u.name, u.email, t.role, t.side, t.joined_at
    FROM project_team t
    JOIN users u ON u.id = t.user_id
"#;

/// Membership of `user_id` in `project_id`, if any
pub async fn get_membership(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
) -> Result<Option<TeamMember>> {
    let member = sqlx::query_as::<_, TeamMember>(&format!(
        "{} WHERE t.project_id = ? AND t.user_id = ?",
        MEMBER_SELECT
    ))
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(member)
}

/// Team members, lead first, then members, then observers
pub async fn list_team(pool: &SqlitePool, project_id: &str) -> Result<Vec<TeamMember>> {
    let members = sqlx::query_as::<_, TeamMember>(&format!(
        r#"{} WHERE t.project_id = ?
        ORDER BY CASE t.role WHEN 'lead' THEN 0 WHEN 'member' THEN 1 ELSE 2 END, t.joined_at, u.name
        "#,
        MEMBER_SELECT
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Add a user to a project team; already on the team is a `Conflict`
pub async fn add_member(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
    role: TeamRole,
    side: Side,
) -> Result<TeamMember> {
    let result = sqlx::query(
        "INSERT INTO project_team (project_id, user_id, role, side, joined_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .bind(side)
    .bind(time::now_string())
    .execute(pool)
    .await
    .map_err(Error::from);

    match result {
        Ok(_) => {}
        Err(e) if e.is_unique_violation() => {
            return Err(Error::Conflict("User is already on the project team".to_string()));
        }
        Err(e) => return Err(e),
    }

    get_membership(pool, project_id, user_id)
        .await?
        .ok_or_else(|| Error::Internal("Team member vanished after insert".to_string()))
}

pub async fn remove_member(pool: &SqlitePool, project_id: &str, user_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM project_team WHERE project_id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of voting (non-observer) members on each side: `(clinical, industry)`
pub async fn voting_team_sizes(pool: &SqlitePool, project_id: &str) -> Result<(u32, u32)> {
    let (clinical, industry): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN side = 'clinical' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN side = 'industry' THEN 1 ELSE 0 END), 0)
        FROM project_team
        WHERE project_id = ? AND role != 'observer'
        "#,
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    Ok((clinical.max(0) as u32, industry.max(0) as u32))
}

/// User ids of every team member
pub async fn member_ids(pool: &SqlitePool, project_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM project_team WHERE project_id = ? ORDER BY joined_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
