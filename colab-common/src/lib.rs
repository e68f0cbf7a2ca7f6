//! # Colab Common Library
//!
//! Shared code for the Colab research-collaboration server:
//! - Database schema, models and queries
//! - Event types (CollabEvent enum) and EventBus
//! - Consensus calculation and notification templating
//! - Bootstrap configuration loading
//! - Password hashing and session tokens

pub mod auth;
pub mod config;
pub mod consensus;
pub mod db;
pub mod error;
pub mod events;
pub mod notify;
pub mod time;

pub use consensus::{Consensus, ConsensusStatus, TeamTally};
pub use error::{Error, Result};
