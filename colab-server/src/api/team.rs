//! Project team endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use colab_common::auth::normalize_email;
use colab_common::consensus::Side;
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::{team, users, TeamMember, TeamRole};
use colab_common::events::CollabEvent;
use colab_common::notify::{NotificationKind, TemplateContext};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::access::project_access;
use super::{notifications, votes, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: TeamRole,
    /// Defaults to the user's own `user_type`
    pub side: Option<Side>,
}

/// GET /api/projects/:id/team
pub async fn list_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    project_access(&state.db, &id, &auth.user).await?;
    Ok(Json(team::list_team(&state.db, &id).await?))
}

/// POST /api/projects/:id/team
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_lead()?;

    if req.role == TeamRole::Lead {
        return Err(ApiError::BadRequest(
            "A project has exactly one lead; add members or observers".to_string(),
        ));
    }

    let email = normalize_email(&req.email)?;
    let user = users::find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user with email {}", email)))?;

    let side = req.side.unwrap_or(user.user_type);
    let member = team::add_member(&state.db, &id, &user.id, req.role, side).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &id,
            user_id: Some(&auth.user.id),
            action: "member_added",
            entity_type: "team",
            entity_id: &user.id,
            details: json!({ "role": member.role, "side": member.side }),
        },
    )
    .await?;

    votes::refresh_project(&state, &access.project).await?;

    info!("User {} joined project {} as {}", user.id, id, member.role);
    state.event_bus.emit_lossy(CollabEvent::TeamChanged {
        project_id: id.clone(),
        user_id: user.id.clone(),
        added: true,
        timestamp: Utc::now(),
    });

    let link = format!("/projects/{}", id);
    notifications::deliver(
        &state,
        &[(user.id.clone(), NotificationKind::TeamAdded)],
        Some(&id),
        &TemplateContext {
            actor: &auth.user.name,
            project_title: &access.project.title,
            detail: member.role.as_str(),
            ..Default::default()
        },
        Some(&link),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /api/projects/:id/team/:user_id
///
/// The lead cannot be removed. A removed member's votes stop counting and
/// every discussion's consensus is recomputed.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_lead()?;

    if user_id == access.project.lead_id {
        return Err(ApiError::BadRequest(
            "The project lead cannot be removed".to_string(),
        ));
    }

    if !team::remove_member(&state.db, &id, &user_id).await? {
        return Err(ApiError::NotFound(format!(
            "User {} is not on project {}",
            user_id, id
        )));
    }

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &id,
            user_id: Some(&auth.user.id),
            action: "member_removed",
            entity_type: "team",
            entity_id: &user_id,
            details: json!({}),
        },
    )
    .await?;

    votes::refresh_project(&state, &access.project).await?;

    info!("User {} removed from project {}", user_id, id);
    state.event_bus.emit_lossy(CollabEvent::TeamChanged {
        project_id: id,
        user_id,
        added: false,
        timestamp: Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}
