//! Session authentication
//!
//! Clients register or log in to obtain a bearer token and send it as
//! `Authorization: Bearer <token>`. The middleware resolves the token to a
//! user and stores an [`AuthUser`] in the request extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use colab_common::auth::{hash_password, normalize_email, parse_bearer, validate_password, verify_password};
use colab_common::consensus::Side;
use colab_common::db::{sessions, users, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated caller, inserted by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

/// Authentication middleware
///
/// Rejects requests without a live session with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer)
        .map(str::to_string)
        .ok_or_else(|| {
            warn!("Rejected {} {}: missing bearer token", request.method(), request.uri().path());
            ApiError::Unauthorized("Missing bearer token".to_string())
        })?;

    let user = sessions::user_for_token(&state.db, &token).await.map_err(|e| {
        warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser { user, token });
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub user_type: Side,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: String,
    pub user: User,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email)?;
    let name = required("name", &req.name)?;
    validate_password(&req.password)?;

    let password = hash_password(&req.password);
    let user = users::create_user(&state.db, &email, &name, req.user_type, &password).await?;
    let session = sessions::create_session(&state.db, &user.id, state.session_ttl_hours).await?;

    info!("Registered user {} ({})", user.id, user.user_type);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = normalize_email(&req.email).map_err(|_| invalid())?;
    let Some(creds) = users::get_credentials_by_email(&state.db, &email).await? else {
        warn!("Login failed: unknown email");
        return Err(invalid());
    };

    if !verify_password(&req.password, &creds.password_hash, &creds.password_salt) {
        warn!("Login failed for user {}: wrong password", creds.id);
        return Err(invalid());
    }

    let user = users::get_user(&state.db, &creds.id).await?;
    let session = sessions::create_session(&state.db, &user.id, state.session_ttl_hours).await?;

    info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    sessions::delete_session(&state.db, &auth.token).await?;
    info!("User {} logged out", auth.user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(Extension(auth): Extension<AuthUser>) -> Json<User> {
    Json(auth.user)
}
