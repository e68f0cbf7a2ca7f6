//! Project endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::{projects, Project, ProjectStatus, ProjectSummary};
use colab_common::events::CollabEvent;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::access::project_access;
use super::{required, required_opt, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsParams {
    #[serde(default)]
    pub include_archived: bool,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListProjectsParams>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let filter = projects::ProjectFilter {
        include_archived: params.include_archived,
        search,
    };

    let list = projects::list_projects_for_user(&state.db, &auth.user.id, &filter).await?;
    Ok(Json(list))
}

/// POST /api/projects
///
/// The creator becomes the project lead.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = required("title", &req.title)?;
    let project =
        projects::create_project(&state.db, &auth.user, &title, req.description.trim()).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &project.id,
            user_id: Some(&auth.user.id),
            action: "created",
            entity_type: "project",
            entity_id: &project.id,
            details: json!({ "title": project.title }),
        },
    )
    .await?;

    info!("User {} created project {}", auth.user.id, project.id);
    emit_updated(&state, &project);

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectSummary>> {
    project_access(&state.db, &id, &auth.user).await?;
    let summary = projects::get_project_summary(&state.db, &id, &auth.user.id).await?;
    Ok(Json(summary))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_lead()?;

    let title = required_opt("title", req.title.as_deref())?;
    let description = req.description.as_deref().map(str::trim);
    let project = projects::update_project(&state.db, &id, title.as_deref(), description).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &project.id,
            user_id: Some(&auth.user.id),
            action: "updated",
            entity_type: "project",
            entity_id: &project.id,
            details: json!({ "title": project.title }),
        },
    )
    .await?;

    emit_updated(&state, &project);
    Ok(Json(project))
}

/// POST /api/projects/:id/archive
pub async fn archive_project(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    id: Path<String>,
) -> ApiResult<Json<Project>> {
    change_status(state, auth, id, ProjectStatus::Archived).await
}

/// POST /api/projects/:id/unarchive
pub async fn unarchive_project(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    id: Path<String>,
) -> ApiResult<Json<Project>> {
    change_status(state, auth, id, ProjectStatus::Active).await
}

async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    status: ProjectStatus,
) -> ApiResult<Json<Project>> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_lead()?;

    if access.project.status == status {
        return Ok(Json(access.project));
    }

    let project = projects::set_status(&state.db, &id, status).await?;
    let action = match status {
        ProjectStatus::Archived => "archived",
        ProjectStatus::Active => "unarchived",
    };

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &project.id,
            user_id: Some(&auth.user.id),
            action,
            entity_type: "project",
            entity_id: &project.id,
            details: json!({ "status": status }),
        },
    )
    .await?;

    info!("Project {} {}", project.id, action);
    emit_updated(&state, &project);
    Ok(Json(project))
}

/// DELETE /api/projects/:id
///
/// Removes the project with its team, discussions and activity.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_lead()?;

    projects::delete_project(&state.db, &id).await?;
    info!("User {} deleted project {}", auth.user.id, id);

    state.event_bus.emit_lossy(CollabEvent::ProjectDeleted {
        project_id: id,
        timestamp: Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}

fn emit_updated(state: &AppState, project: &Project) {
    state.event_bus.emit_lossy(CollabEvent::ProjectUpdated {
        project: project.clone(),
        timestamp: Utc::now(),
    });
}
