//! Database schema, models and queries
//!
//! One module per entity; each exposes free `async fn(pool, ...)` functions
//! returning `crate::Result`.

pub mod activity;
pub mod comments;
pub mod decisions;
pub mod discussions;
pub mod evidence;
pub mod init;
pub mod models;
pub mod notifications;
pub mod projects;
pub mod sessions;
pub mod team;
pub mod users;
pub mod votes;

pub use init::{init_database, init_schema};
pub use models::*;

/// New random entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
