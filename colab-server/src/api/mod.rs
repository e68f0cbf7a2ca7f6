//! HTTP API handlers
//!
//! One module per resource. Project-scoped handlers resolve the caller's
//! team membership through [`access`] before touching anything.

pub mod access;
pub mod activity;
pub mod auth;
pub mod comments;
pub mod decisions;
pub mod discussions;
pub mod evidence;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod team;
pub mod users;
pub mod votes;

pub use auth::{auth_middleware, AuthUser};
pub use health::health_routes;

use crate::error::{ApiError, ApiResult};

/// Trim a required text field, rejecting it when empty
pub(crate) fn required(field: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

/// [`required`] for optional update fields
pub(crate) fn required_opt(field: &str, value: Option<&str>) -> ApiResult<Option<String>> {
    value.map(|v| required(field, v)).transpose()
}
