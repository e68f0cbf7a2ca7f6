//! Notification endpoints and delivery

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use colab_common::db::{notifications, Notification};
use colab_common::events::CollabEvent;
use colab_common::notify::{NotificationKind, TemplateContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// Store one notification per recipient and push each to its recipient's
/// WebSocket clients
pub(crate) async fn deliver(
    state: &AppState,
    recipients: &[(String, NotificationKind)],
    project_id: Option<&str>,
    ctx: &TemplateContext<'_>,
    link: Option<&str>,
) -> ApiResult<()> {
    for (user_id, kind) in recipients {
        let message = kind.render(ctx);
        let notification = notifications::create_notification(
            &state.db, user_id, project_id, *kind, &message, link,
        )
        .await?;

        debug!("Notified {} ({})", user_id, kind);
        state.event_bus.emit_lossy(CollabEvent::NotificationCreated {
            notification,
            timestamp: Utc::now(),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsParams {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListNotificationsParams>,
) -> ApiResult<Json<notifications::NotificationPage>> {
    let page = notifications::list_notifications(&state.db, &auth.user.id, params.unread_only).await?;
    Ok(Json(page))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(notifications::mark_read(&state.db, &auth.user.id, &id).await?))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub marked: u64,
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let marked = notifications::mark_all_read(&state.db, &auth.user.id).await?;
    Ok(Json(MarkAllReadResponse { marked }))
}
