//! Decision records

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use colab_common::db::{decisions, Decision};

use super::access::project_access;
use super::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/projects/:id/decisions
pub async fn list_decisions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Decision>>> {
    project_access(&state.db, &id, &auth.user).await?;
    Ok(Json(decisions::list_decisions(&state.db, &id).await?))
}

/// GET /api/decisions/:id
pub async fn get_decision(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Decision>> {
    let decision = decisions::get_decision(&state.db, &id).await?;
    project_access(&state.db, &decision.project_id, &auth.user).await?;
    Ok(Json(decision))
}
