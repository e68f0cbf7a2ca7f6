//! User profile endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use colab_common::consensus::Side;
use colab_common::db::{users, User};
use serde::Deserialize;
use tracing::info;

use super::{required_opt, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub user_type: Option<Side>,
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(users::get_user(&state.db, &id).await?))
}

/// PUT /api/users/me
///
/// Changing `user_type` does not move the user between sides on existing
/// teams; team side is fixed when they join.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let name = required_opt("name", req.name.as_deref())?;
    let user = users::update_user(&state.db, &auth.user.id, name.as_deref(), req.user_type).await?;
    info!("User {} updated profile", user.id);
    Ok(Json(user))
}
