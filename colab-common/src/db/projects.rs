//! Project queries

use sqlx::SqlitePool;

use super::models::{Project, ProjectStatus, ProjectSummary, TeamRole, User};
use super::new_id;
use crate::{time, Error, Result};

const PROJECT_COLUMNS: &str =
    "p.id, p.title, p.description, p.status, p.lead_id, p.created_at, p.updated_at";

/// Filters for the project listing
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter<'a> {
    pub include_archived: bool,
    /// Case-insensitive substring match on title or description
    pub search: Option<&'a str>,
}

/// Create a project and enrol its creator as lead, in one transaction
pub async fn create_project(
    pool: &SqlitePool,
    lead: &User,
    title: &str,
    description: &str,
) -> Result<Project> {
    let id = new_id();
    let now = time::now_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO projects (id, title, description, status, lead_id, created_at, updated_at)
        VALUES (?, ?, ?, 'active', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(description)
    .bind(&lead.id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO project_team (project_id, user_id, role, side, joined_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&lead.id)
    .bind(TeamRole::Lead)
    .bind(lead.user_type)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_project(pool, &id).await
}

pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {} FROM projects p WHERE p.id = ?",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Project {}", id)))
}

fn summary_select() -> String {
    format!(
        r#"
        SELECT {},
               t.role AS my_role,
               (SELECT COUNT(*) FROM project_team pt WHERE pt.project_id = p.id) AS team_size,
               (SELECT COUNT(*) FROM discussions d WHERE d.project_id = p.id) AS discussion_count
        FROM projects p
        JOIN project_team t ON t.project_id = p.id AND t.user_id = ?
        "#,
        PROJECT_COLUMNS
    )
}

/// Projects the user is on, newest activity first
///
/// Archived projects are hidden unless `include_archived` is set.
pub async fn list_projects_for_user(
    pool: &SqlitePool,
    user_id: &str,
    filter: &ProjectFilter<'_>,
) -> Result<Vec<ProjectSummary>> {
    let pattern = filter.search.map(like_pattern);

    let sql = format!(
        r#"{}
        WHERE (? OR p.status = 'active')
          AND (? IS NULL OR p.title LIKE ? ESCAPE '\' OR p.description LIKE ? ESCAPE '\')
        ORDER BY p.updated_at DESC, p.created_at DESC
        "#,
        summary_select()
    );

    let projects = sqlx::query_as::<_, ProjectSummary>(&sql)
        .bind(user_id)
        .bind(filter.include_archived)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(pool)
        .await?;

    Ok(projects)
}

/// Single project with the caller's role and counts
pub async fn get_project_summary(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
) -> Result<ProjectSummary> {
    let sql = format!("{} WHERE p.id = ?", summary_select());

    sqlx::query_as::<_, ProjectSummary>(&sql)
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project {}", project_id)))
}

/// Update title and/or description; `None` leaves a field unchanged
pub async fn update_project(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<Project> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(time::now_string())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Project {}", id)));
    }

    get_project(pool, id).await
}

pub async fn set_status(pool: &SqlitePool, id: &str, status: ProjectStatus) -> Result<Project> {
    let result = sqlx::query("UPDATE projects SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(time::now_string())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Project {}", id)));
    }

    get_project(pool, id).await
}

/// Bump `updated_at` so the project sorts as recently active
pub async fn touch(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
        .bind(time::now_string())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a project and everything hanging off it (FK cascade)
pub async fn delete_project(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Project {}", id)));
    }

    Ok(())
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
