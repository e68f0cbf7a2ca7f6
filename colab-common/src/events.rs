//! Event types for the Colab event system
//!
//! Every mutation emits a [`CollabEvent`] on the [`EventBus`]. The WebSocket
//! layer subscribes to the bus and forwards project events to clients
//! subscribed to that project, and notification events to their recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::consensus::Consensus;
use crate::db::models::{Comment, Decision, Discussion, EvidenceLink, Notification, Project};

/// Colab event types
///
/// Serialized with a `type` tag so clients can switch on `event.type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollabEvent {
    /// Project created, edited, archived or restored
    ProjectUpdated {
        project: Project,
        timestamp: DateTime<Utc>,
    },

    /// Project and everything in it removed
    ProjectDeleted {
        project_id: String,
        timestamp: DateTime<Utc>,
    },

    DiscussionCreated {
        discussion: Discussion,
        timestamp: DateTime<Utc>,
    },

    DiscussionUpdated {
        discussion: Discussion,
        timestamp: DateTime<Utc>,
    },

    /// A vote was cast, changed or withdrawn
    VoteCast {
        project_id: String,
        discussion_id: String,
        user_id: String,
        consensus: Consensus,
        timestamp: DateTime<Utc>,
    },

    CommentAdded {
        project_id: String,
        comment: Comment,
        timestamp: DateTime<Utc>,
    },

    CommentDeleted {
        project_id: String,
        discussion_id: String,
        comment_id: String,
        timestamp: DateTime<Utc>,
    },

    EvidenceAdded {
        project_id: String,
        evidence: EvidenceLink,
        timestamp: DateTime<Utc>,
    },

    EvidenceRemoved {
        project_id: String,
        discussion_id: String,
        evidence_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Consensus crossed the decision threshold
    DecisionReached {
        decision: Decision,
        timestamp: DateTime<Utc>,
    },

    /// Member added or removed
    TeamChanged {
        project_id: String,
        user_id: String,
        added: bool,
        timestamp: DateTime<Utc>,
    },

    /// Delivered only to `notification.user_id`
    NotificationCreated {
        notification: Notification,
        timestamp: DateTime<Utc>,
    },
}

impl CollabEvent {
    /// Project the event belongs to, if it is project scoped
    pub fn project_id(&self) -> Option<&str> {
        match self {
            CollabEvent::ProjectUpdated { project, .. } => Some(&project.id),
            CollabEvent::DiscussionCreated { discussion, .. }
            | CollabEvent::DiscussionUpdated { discussion, .. } => Some(&discussion.project_id),
            CollabEvent::ProjectDeleted { project_id, .. }
            | CollabEvent::VoteCast { project_id, .. }
            | CollabEvent::CommentAdded { project_id, .. }
            | CollabEvent::CommentDeleted { project_id, .. }
            | CollabEvent::EvidenceAdded { project_id, .. }
            | CollabEvent::EvidenceRemoved { project_id, .. }
            | CollabEvent::TeamChanged { project_id, .. } => Some(project_id),
            CollabEvent::DecisionReached { decision, .. } => Some(&decision.project_id),
            CollabEvent::NotificationCreated { .. } => None,
        }
    }

    /// Recipient of a user-scoped event
    pub fn recipient(&self) -> Option<&str> {
        match self {
            CollabEvent::NotificationCreated { notification, .. } => Some(&notification.user_id),
            _ => None,
        }
    }

    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            CollabEvent::ProjectUpdated { .. } => "ProjectUpdated",
            CollabEvent::ProjectDeleted { .. } => "ProjectDeleted",
            CollabEvent::DiscussionCreated { .. } => "DiscussionCreated",
            CollabEvent::DiscussionUpdated { .. } => "DiscussionUpdated",
            CollabEvent::VoteCast { .. } => "VoteCast",
            CollabEvent::CommentAdded { .. } => "CommentAdded",
            CollabEvent::CommentDeleted { .. } => "CommentDeleted",
            CollabEvent::EvidenceAdded { .. } => "EvidenceAdded",
            CollabEvent::EvidenceRemoved { .. } => "EvidenceRemoved",
            CollabEvent::DecisionReached { .. } => "DecisionReached",
            CollabEvent::TeamChanged { .. } => "TeamChanged",
            CollabEvent::NotificationCreated { .. } => "NotificationCreated",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and miss
/// events; there is no replay.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CollabEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    ///
    /// # Examples
    ///
    /// ```
    /// use colab_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CollabEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CollabEvent,
    ) -> Result<usize, broadcast::error::SendError<CollabEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CollabEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_changed(project_id: &str) -> CollabEvent {
        CollabEvent::TeamChanged {
            project_id: project_id.to_string(),
            user_id: "u1".to_string(),
            added: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(8);
        assert!(bus.emit(team_changed("p1")).is_err());
        // emit_lossy must not panic
        bus.emit_lossy(team_changed("p1"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(team_changed("p1")).unwrap(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.project_id(), Some("p1"));
        assert_eq!(event.recipient(), None);
    }

    #[test]
    fn test_serialized_type_tag_matches_event_type() {
        let event = team_changed("p1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["project_id"], "p1");
        assert_eq!(json["added"], true);
    }
}
