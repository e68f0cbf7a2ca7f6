//! colab-server library
//!
//! REST + WebSocket server for collaborative research projects. Handlers
//! live in [`api`]; the WebSocket channel and its client map live in [`ws`].

use axum::Router;
use chrono::{DateTime, Utc};
use colab_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod ws;

pub use error::{ApiError, ApiResult};
use ws::ClientRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus feeding WebSocket clients
    pub event_bus: EventBus,
    /// Connected WebSocket clients and their project subscriptions
    pub clients: ClientRegistry,
    /// Lifetime of newly issued session tokens
    pub session_ttl_hours: i64,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, session_ttl_hours: i64) -> Self {
        Self {
            db,
            event_bus,
            clients: ClientRegistry::default(),
            session_ttl_hours,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Everything under `/api` except register/login sits behind the bearer-token
/// middleware. `/ws` authenticates its own upgrade request.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    // Protected routes (require a session)
    let protected = Router::new()
        // Session
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        // Users
        .route("/api/users/me", get(api::auth::me).put(api::users::update_me))
        .route("/api/users/:id", get(api::users::get_user))
        // Projects
        .route(
            "/api/projects",
            get(api::projects::list_projects).post(api::projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(api::projects::get_project)
                .put(api::projects::update_project)
                .delete(api::projects::delete_project),
        )
        .route("/api/projects/:id/archive", post(api::projects::archive_project))
        .route("/api/projects/:id/unarchive", post(api::projects::unarchive_project))
        // Team
        .route(
            "/api/projects/:id/team",
            get(api::team::list_team).post(api::team::add_member),
        )
        .route("/api/projects/:id/team/:user_id", delete(api::team::remove_member))
        // Discussions
        .route(
            "/api/projects/:id/discussions",
            get(api::discussions::list_discussions).post(api::discussions::create_discussion),
        )
        .route(
            "/api/discussions/:id",
            get(api::discussions::get_discussion).put(api::discussions::update_discussion),
        )
        // Votes and consensus
        .route(
            "/api/discussions/:id/votes",
            get(api::votes::list_votes)
                .post(api::votes::cast_vote)
                .delete(api::votes::withdraw_vote),
        )
        .route("/api/discussions/:id/consensus", get(api::votes::get_consensus))
        // Comments
        .route(
            "/api/discussions/:id/comments",
            get(api::comments::list_comments).post(api::comments::add_comment),
        )
        .route("/api/comments/:id", delete(api::comments::delete_comment))
        // Evidence
        .route(
            "/api/discussions/:id/evidence",
            get(api::evidence::list_evidence).post(api::evidence::add_evidence),
        )
        .route("/api/evidence/:id", delete(api::evidence::delete_evidence))
        // Decisions and activity
        .route("/api/projects/:id/decisions", get(api::decisions::list_decisions))
        .route("/api/decisions/:id", get(api::decisions::get_decision))
        .route("/api/projects/:id/activity", get(api::activity::list_activity))
        // Notifications
        .route("/api/notifications", get(api::notifications::list_notifications))
        .route(
            "/api/notifications/read-all",
            post(api::notifications::mark_all_read),
        )
        .route("/api/notifications/:id/read", post(api::notifications::mark_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no session required)
    let public = Router::new()
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login))
        .route("/ws", get(ws::ws_handler))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
