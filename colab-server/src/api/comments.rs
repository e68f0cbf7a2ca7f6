//! Threaded comments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::comments::{self, CommentNode};
use colab_common::db::{discussions, projects};
use colab_common::events::CollabEvent;
use colab_common::notify::{comment_recipients, TemplateContext};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::access::discussion_access;
use super::discussions::discussion_link;
use super::{notifications, required, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
    /// Reply target; must belong to the same discussion
    pub parent_comment_id: Option<String>,
}

/// GET /api/discussions/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CommentNode>>> {
    discussion_access(&state.db, &id, &auth.user).await?;
    let flat = comments::list_comments(&state.db, &id).await?;
    Ok(Json(comments::build_thread(flat)))
}

/// POST /api/discussions/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let (discussion, access) = discussion_access(&state.db, &id, &auth.user).await?;
    access.require_writable()?;

    let content = required("content", &req.content)?;

    let parent = match req.parent_comment_id.as_deref() {
        Some(parent_id) => {
            let parent = comments::get_comment(&state.db, parent_id)
                .await
                .map_err(|e| match e {
                    colab_common::Error::NotFound(_) => {
                        ApiError::BadRequest(format!("Unknown parent comment {}", parent_id))
                    }
                    other => other.into(),
                })?;
            if parent.discussion_id != discussion.id {
                return Err(ApiError::BadRequest(
                    "Parent comment belongs to another discussion".to_string(),
                ));
            }
            Some(parent)
        }
        None => None,
    };

    let comment = comments::add_comment(
        &state.db,
        &id,
        &auth.user.id,
        parent.as_ref().map(|p| p.id.as_str()),
        &content,
    )
    .await?;
    discussions::touch(&state.db, &id).await?;
    projects::touch(&state.db, &discussion.project_id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: if parent.is_some() { "replied" } else { "commented" },
            entity_type: "comment",
            entity_id: &comment.id,
            details: json!({ "discussion_id": discussion.id }),
        },
    )
    .await?;

    info!("User {} commented on discussion {}", auth.user.id, id);
    state.event_bus.emit_lossy(CollabEvent::CommentAdded {
        project_id: discussion.project_id.clone(),
        comment: comment.clone(),
        timestamp: Utc::now(),
    });

    let recipients = comment_recipients(
        &auth.user.id,
        &discussion.author_id,
        parent.as_ref().map(|p| p.author_id.as_str()),
    );
    let link = discussion_link(&discussion);

    notifications::deliver(
        &state,
        &recipients,
        Some(&discussion.project_id),
        &TemplateContext {
            actor: &auth.user.name,
            project_title: &access.project.title,
            discussion_title: &discussion.title,
            ..Default::default()
        },
        Some(&link),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/:id
///
/// Author or project lead. Replies are deleted with their parent.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let comment = comments::get_comment(&state.db, &id).await?;
    let (discussion, access) = discussion_access(&state.db, &comment.discussion_id, &auth.user).await?;
    access.require_owner_or_lead(&comment.author_id)?;
    access.require_active()?;

    comments::delete_comment(&state.db, &id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: "deleted",
            entity_type: "comment",
            entity_id: &id,
            details: json!({ "discussion_id": discussion.id }),
        },
    )
    .await?;

    state.event_bus.emit_lossy(CollabEvent::CommentDeleted {
        project_id: discussion.project_id,
        discussion_id: discussion.id,
        comment_id: id,
        timestamp: Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}
