//! Database models
//!
//! Row types returned by the query modules. Enum columns are stored as
//! lower-case TEXT and decode through `sqlx::Type`.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::consensus::{str_enum, ConsensusStatus, Side, VoteValue};
use crate::notify::NotificationKind;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
}

/// Role of a user within a project team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TeamRole {
    Lead,
    Member,
    Observer,
}

impl TeamRole {
    /// Leads and members may post, vote and attach evidence
    pub fn can_contribute(&self) -> bool {
        matches!(self, TeamRole::Lead | TeamRole::Member)
    }
}

/// Kind of discussion thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiscussionType {
    Brainstorm,
    Question,
    Decision,
    Evidence,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiscussionStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EvidenceType {
    Paper,
    Dataset,
    ClinicalTrial,
    Patent,
    Website,
    Other,
}

str_enum!(ProjectStatus { Active => "active", Archived => "archived" });
str_enum!(TeamRole { Lead => "lead", Member => "member", Observer => "observer" });
str_enum!(DiscussionType {
    Brainstorm => "brainstorm",
    Question => "question",
    Decision => "decision",
    Evidence => "evidence",
    General => "general",
});
str_enum!(DiscussionStatus { Open => "open", Resolved => "resolved" });
str_enum!(EvidenceType {
    Paper => "paper",
    Dataset => "dataset",
    ClinicalTrial => "clinical_trial",
    Patent => "patent",
    Website => "website",
    Other => "other",
});

/// Public user record (never carries credentials)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub user_type: Side,
    pub created_at: String,
    pub updated_at: String,
}

/// Stored password material for login verification
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: String,
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub lead_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Project row with the caller's role and aggregate counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub my_role: TeamRole,
    pub team_size: i64,
    pub discussion_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub side: Side,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Discussion {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub discussion_type: DiscussionType,
    pub status: DiscussionStatus,
    pub consensus_status: ConsensusStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub discussion_id: String,
    pub user_id: String,
    pub user_name: String,
    pub vote: VoteValue,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvidenceLink {
    pub id: String,
    pub discussion_id: String,
    pub added_by: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub evidence_type: EvidenceType,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub discussion_id: String,
    pub author_id: String,
    pub author_name: String,
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Decision {
    pub id: String,
    pub project_id: String,
    pub discussion_id: String,
    pub title: String,
    pub summary: String,
    pub consensus_score: f64,
    pub clinical_agreement: f64,
    pub industry_agreement: f64,
    pub decided_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub project_id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Json<serde_json::Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}
