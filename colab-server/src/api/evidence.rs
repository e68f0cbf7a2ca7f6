//! Evidence links attached to discussions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::evidence::{self, validate_url};
use colab_common::db::{discussions, projects, EvidenceLink, EvidenceType};
use colab_common::events::CollabEvent;
use colab_common::notify::{team_recipients, NotificationKind, TemplateContext};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::access::discussion_access;
use super::discussions::discussion_link;
use super::{notifications, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddEvidenceRequest {
    pub url: String,
    /// Defaults to the URL
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub evidence_type: Option<EvidenceType>,
}

/// GET /api/discussions/:id/evidence
pub async fn list_evidence(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EvidenceLink>>> {
    discussion_access(&state.db, &id, &auth.user).await?;
    Ok(Json(evidence::list_evidence(&state.db, &id).await?))
}

/// POST /api/discussions/:id/evidence
///
/// Only absolute http(s) URLs are accepted.
pub async fn add_evidence(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<AddEvidenceRequest>,
) -> ApiResult<impl IntoResponse> {
    let (discussion, access) = discussion_access(&state.db, &id, &auth.user).await?;
    access.require_writable()?;

    let url = validate_url(&req.url)?;
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&url)
        .to_string();

    let link = evidence::add_evidence(
        &state.db,
        &id,
        &auth.user.id,
        &url,
        &title,
        req.description.trim(),
        req.evidence_type.unwrap_or(EvidenceType::Other),
    )
    .await?;
    discussions::touch(&state.db, &id).await?;
    projects::touch(&state.db, &discussion.project_id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: "evidence_added",
            entity_type: "evidence",
            entity_id: &link.id,
            details: json!({ "discussion_id": discussion.id, "url": link.url }),
        },
    )
    .await?;

    info!("User {} attached evidence to discussion {}", auth.user.id, id);
    state.event_bus.emit_lossy(CollabEvent::EvidenceAdded {
        project_id: discussion.project_id.clone(),
        evidence: link.clone(),
        timestamp: Utc::now(),
    });

    let recipients: Vec<_> = team_recipients([discussion.author_id.as_str()], Some(&auth.user.id))
        .into_iter()
        .map(|user_id| (user_id, NotificationKind::EvidenceAdded))
        .collect();
    let target = discussion_link(&discussion);

    notifications::deliver(
        &state,
        &recipients,
        Some(&discussion.project_id),
        &TemplateContext {
            actor: &auth.user.name,
            project_title: &access.project.title,
            discussion_title: &discussion.title,
            detail: &link.title,
        },
        Some(&target),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /api/evidence/:id
///
/// The user who attached it, or the project lead.
pub async fn delete_evidence(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let link = evidence::get_evidence(&state.db, &id).await?;
    let (discussion, access) = discussion_access(&state.db, &link.discussion_id, &auth.user).await?;
    access.require_owner_or_lead(&link.added_by)?;
    access.require_active()?;

    evidence::delete_evidence(&state.db, &id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: "evidence_removed",
            entity_type: "evidence",
            entity_id: &id,
            details: json!({ "discussion_id": discussion.id, "url": link.url }),
        },
    )
    .await?;

    state.event_bus.emit_lossy(CollabEvent::EvidenceRemoved {
        project_id: discussion.project_id,
        discussion_id: discussion.id,
        evidence_id: id,
        timestamp: Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}
