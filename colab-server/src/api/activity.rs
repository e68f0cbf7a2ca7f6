//! Project activity feed

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use colab_common::db::{activity, ActivityEntry};
use serde::Deserialize;

use super::access::project_access;
use super::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<i64>,
}

/// GET /api/projects/:id/activity
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    project_access(&state.db, &id, &auth.user).await?;
    Ok(Json(activity::list_activity(&state.db, &id, params.limit).await?))
}
