//! Discussion endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use colab_common::consensus::Consensus;
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::discussions::{self, DiscussionCounts, DiscussionFilter, DiscussionSort};
use colab_common::db::{projects, team, Discussion, DiscussionStatus, DiscussionType};
use colab_common::events::CollabEvent;
use colab_common::notify::{team_recipients, NotificationKind, TemplateContext};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::access::{discussion_access, project_access};
use super::{notifications, required, required_opt, votes, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListDiscussionsParams {
    #[serde(rename = "type")]
    pub discussion_type: Option<DiscussionType>,
    pub status: Option<DiscussionStatus>,
    #[serde(default)]
    pub sort: DiscussionSort,
}

#[derive(Debug, Deserialize)]
pub struct CreateDiscussionRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub discussion_type: Option<DiscussionType>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDiscussionRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DiscussionStatus>,
}

/// Discussion with its live consensus and activity counts
#[derive(Debug, Serialize)]
pub struct DiscussionDetail {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub consensus: Consensus,
    #[serde(flatten)]
    pub counts: DiscussionCounts,
}

/// GET /api/projects/:id/discussions
pub async fn list_discussions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(params): Query<ListDiscussionsParams>,
) -> ApiResult<Json<Vec<Discussion>>> {
    project_access(&state.db, &id, &auth.user).await?;

    let filter = DiscussionFilter {
        discussion_type: params.discussion_type,
        status: params.status,
        sort: params.sort,
    };
    Ok(Json(discussions::list_discussions(&state.db, &id, &filter).await?))
}

/// POST /api/projects/:id/discussions
///
/// Notifies the rest of the team.
pub async fn create_discussion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<CreateDiscussionRequest>,
) -> ApiResult<impl IntoResponse> {
    let access = project_access(&state.db, &id, &auth.user).await?;
    access.require_writable()?;

    let title = required("title", &req.title)?;
    let discussion_type = req.discussion_type.unwrap_or(DiscussionType::General);
    let discussion = discussions::create_discussion(
        &state.db,
        &id,
        &auth.user.id,
        &title,
        req.content.trim(),
        discussion_type,
    )
    .await?;
    projects::touch(&state.db, &id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &id,
            user_id: Some(&auth.user.id),
            action: "created",
            entity_type: "discussion",
            entity_id: &discussion.id,
            details: json!({ "title": discussion.title, "type": discussion.discussion_type }),
        },
    )
    .await?;

    info!("User {} started discussion {} in {}", auth.user.id, discussion.id, id);
    state.event_bus.emit_lossy(CollabEvent::DiscussionCreated {
        discussion: discussion.clone(),
        timestamp: Utc::now(),
    });

    let members = team::member_ids(&state.db, &id).await?;
    let recipients: Vec<_> =
        team_recipients(members.iter().map(String::as_str), Some(&auth.user.id))
            .into_iter()
            .map(|user_id| (user_id, NotificationKind::DiscussionCreated))
            .collect();
    let link = discussion_link(&discussion);

    notifications::deliver(
        &state,
        &recipients,
        Some(&id),
        &TemplateContext {
            actor: &auth.user.name,
            project_title: &access.project.title,
            discussion_title: &discussion.title,
            ..Default::default()
        },
        Some(&link),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(discussion)))
}

/// GET /api/discussions/:id
pub async fn get_discussion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<DiscussionDetail>> {
    let (discussion, _) = discussion_access(&state.db, &id, &auth.user).await?;
    let consensus = votes::snapshot(&state, &discussion).await?;
    let counts = discussions::counts(&state.db, &id).await?;

    Ok(Json(DiscussionDetail {
        discussion,
        consensus,
        counts,
    }))
}

/// PUT /api/discussions/:id
///
/// Author or project lead; `status` resolves or reopens the thread.
pub async fn update_discussion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDiscussionRequest>,
) -> ApiResult<Json<Discussion>> {
    let (existing, access) = discussion_access(&state.db, &id, &auth.user).await?;
    access.require_owner_or_lead(&existing.author_id)?;
    access.require_active()?;

    let title = required_opt("title", req.title.as_deref())?;
    let content = req.content.as_deref().map(str::trim);
    let discussion =
        discussions::update_discussion(&state.db, &id, title.as_deref(), content, req.status)
            .await?;
    projects::touch(&state.db, &discussion.project_id).await?;

    let action = match (existing.status, discussion.status) {
        (DiscussionStatus::Open, DiscussionStatus::Resolved) => "resolved",
        (DiscussionStatus::Resolved, DiscussionStatus::Open) => "reopened",
        _ => "updated",
    };

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action,
            entity_type: "discussion",
            entity_id: &discussion.id,
            details: json!({ "title": discussion.title, "status": discussion.status }),
        },
    )
    .await?;

    state.event_bus.emit_lossy(CollabEvent::DiscussionUpdated {
        discussion: discussion.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(discussion))
}

pub(crate) fn discussion_link(discussion: &Discussion) -> String {
    format!(
        "/projects/{}/discussions/{}",
        discussion.project_id, discussion.id
    )
}
