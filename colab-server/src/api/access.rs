//! Project membership and role checks
//!
//! A missing project or discussion is 404; an existing one the caller is not
//! on is 403.

use colab_common::db::{discussions, projects, team, Discussion, Project, ProjectStatus, TeamMember, User};
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};

/// The caller's standing in a project
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub project: Project,
    pub member: TeamMember,
}

impl ProjectAccess {
    pub fn is_lead(&self) -> bool {
        self.member.user_id == self.project.lead_id
    }

    pub fn require_lead(&self) -> ApiResult<()> {
        if self.is_lead() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Only the project lead can do this".to_string()))
        }
    }

    /// Leads and members may contribute; observers are read-only
    pub fn require_contributor(&self) -> ApiResult<()> {
        if self.member.role.can_contribute() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Observers have read-only access to this project".to_string(),
            ))
        }
    }

    /// Archived projects accept no new content
    pub fn require_active(&self) -> ApiResult<()> {
        match self.project.status {
            ProjectStatus::Active => Ok(()),
            ProjectStatus::Archived => Err(ApiError::Conflict(format!(
                "Project {} is archived",
                self.project.id
            ))),
        }
    }

    /// Contributor on an active project
    pub fn require_writable(&self) -> ApiResult<()> {
        self.require_contributor()?;
        self.require_active()
    }

    /// The author of an item, or the project lead
    pub fn require_owner_or_lead(&self, owner_id: &str) -> ApiResult<()> {
        if self.member.user_id == owner_id || self.is_lead() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only the author or the project lead can do this".to_string(),
            ))
        }
    }
}

pub async fn project_access(
    db: &SqlitePool,
    project_id: &str,
    user: &User,
) -> ApiResult<ProjectAccess> {
    let project = projects::get_project(db, project_id).await?;
    let member = team::get_membership(db, project_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this project".to_string()))?;

    Ok(ProjectAccess { project, member })
}

/// Load a discussion and the caller's access to its project
pub async fn discussion_access(
    db: &SqlitePool,
    discussion_id: &str,
    user: &User,
) -> ApiResult<(Discussion, ProjectAccess)> {
    let discussion = discussions::get_discussion(db, discussion_id).await?;
    let access = project_access(db, &discussion.project_id, user).await?;
    Ok((discussion, access))
}
