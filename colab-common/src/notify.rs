//! Notification kinds, message templating and fan-out rules

use serde::{Deserialize, Serialize};

use crate::consensus::str_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    DiscussionCreated,
    CommentAdded,
    ReplyAdded,
    EvidenceAdded,
    DecisionReached,
    TeamAdded,
}

str_enum!(NotificationKind {
    DiscussionCreated => "discussion_created",
    CommentAdded => "comment_added",
    ReplyAdded => "reply_added",
    EvidenceAdded => "evidence_added",
    DecisionReached => "decision_reached",
    TeamAdded => "team_added",
});

/// Values substituted into a notification template
#[derive(Debug, Clone, Default)]
pub struct TemplateContext<'a> {
    /// Display name of the user who triggered the notification
    pub actor: &'a str,
    pub project_title: &'a str,
    /// Discussion title (empty for project-level notifications)
    pub discussion_title: &'a str,
    /// Extra detail: team role, evidence title, consensus score
    pub detail: &'a str,
}

impl NotificationKind {
    fn template(&self) -> &'static str {
        match self {
            NotificationKind::DiscussionCreated => {
                "{actor} started a new discussion \"{discussion}\" in {project}"
            }
            NotificationKind::CommentAdded => "{actor} commented on \"{discussion}\" in {project}",
            NotificationKind::ReplyAdded => {
                "{actor} replied to your comment on \"{discussion}\" in {project}"
            }
            NotificationKind::EvidenceAdded => {
                "{actor} attached evidence \"{detail}\" to \"{discussion}\" in {project}"
            }
            NotificationKind::DecisionReached => {
                "Consensus reached on \"{discussion}\" in {project} ({detail}% agreement)"
            }
            NotificationKind::TeamAdded => "{actor} added you to {project} as {detail}",
        }
    }

    /// Render the notification message for this kind
    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        self.template()
            .replace("{actor}", ctx.actor)
            .replace("{project}", ctx.project_title)
            .replace("{discussion}", ctx.discussion_title)
            .replace("{detail}", ctx.detail)
    }
}

/// Recipients of a team-wide notification: everyone except the actor
///
/// Preserves input order and drops duplicates.
pub fn team_recipients<'a>(
    team: impl IntoIterator<Item = &'a str>,
    actor_id: Option<&str>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for user_id in team {
        if Some(user_id) == actor_id || out.iter().any(|u| u == user_id) {
            continue;
        }
        out.push(user_id.to_string());
    }
    out
}

/// Recipients of a comment notification
///
/// Returns `(user_id, kind)` pairs: the discussion author gets
/// `comment_added`, the parent comment's author gets `reply_added`. The
/// commenter is never notified and nobody is notified twice.
pub fn comment_recipients(
    commenter_id: &str,
    discussion_author_id: &str,
    parent_author_id: Option<&str>,
) -> Vec<(String, NotificationKind)> {
    let mut out = Vec::new();

    if let Some(parent_author) = parent_author_id {
        if parent_author != commenter_id {
            out.push((parent_author.to_string(), NotificationKind::ReplyAdded));
        }
    }

    if discussion_author_id != commenter_id
        && !out.iter().any(|(u, _)| u == discussion_author_id)
    {
        out.push((discussion_author_id.to_string(), NotificationKind::CommentAdded));
    }

    out
}
