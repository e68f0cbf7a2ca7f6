//! WebSocket channel
//!
//! `GET /ws?token=<session token>` upgrades to a JSON text channel. Clients
//! send `subscribe` / `unsubscribe` / `ping` frames; the server forwards
//! [`CollabEvent`]s for the projects a client subscribed to, and
//! notification events addressed to the connected user.
//!
//! Delivery is best effort: a client whose event receiver lags skips the
//! missed events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use colab_common::auth::parse_bearer;
use colab_common::db::{sessions, team, User};
use colab_common::events::CollabEvent;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// One connected client
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub user_id: String,
    pub projects: HashSet<String>,
}

/// In-memory map of connected clients
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<Uuid, ClientInfo>>>,
}

impl ClientRegistry {
    pub async fn register(&self, user_id: &str) -> Uuid {
        let client_id = Uuid::new_v4();
        self.clients.write().await.insert(
            client_id,
            ClientInfo {
                user_id: user_id.to_string(),
                projects: HashSet::new(),
            },
        );
        client_id
    }

    pub async fn unregister(&self, client_id: Uuid) {
        self.clients.write().await.remove(&client_id);
    }

    /// Returns false if the client is unknown
    pub async fn subscribe(&self, client_id: Uuid, project_id: &str) -> bool {
        match self.clients.write().await.get_mut(&client_id) {
            Some(client) => {
                client.projects.insert(project_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Returns true if the client was subscribed
    pub async fn unsubscribe(&self, client_id: Uuid, project_id: &str) -> bool {
        self.clients
            .write()
            .await
            .get_mut(&client_id)
            .map(|client| client.projects.remove(project_id))
            .unwrap_or(false)
    }

    /// Drop the subscription `event` revokes for this client
    ///
    /// Removing the client's own user from a team, or deleting a project,
    /// ends its subscription to that project. Returns true if one was dropped.
    pub async fn revoke(&self, client_id: Uuid, event: &CollabEvent) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.get_mut(&client_id) else {
            return false;
        };

        match event {
            CollabEvent::TeamChanged {
                project_id,
                user_id,
                added: false,
                ..
            } if *user_id == client.user_id => client.projects.remove(project_id),
            CollabEvent::ProjectDeleted { project_id, .. } => client.projects.remove(project_id),
            _ => false,
        }
    }

    pub async fn get(&self, client_id: Uuid) -> Option<ClientInfo> {
        self.clients.read().await.get(&client_id).cloned()
    }

    /// Number of connected clients
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Frames sent by clients
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { project_id: String },
    Unsubscribe { project_id: String },
    Ping,
}

/// Control frames sent by the server (events are sent as bare `CollabEvent`s)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { client_id: Uuid, user_id: String },
    Subscribed { project_id: String },
    Unsubscribed { project_id: String },
    Pong,
    Error { message: String },
}

/// Whether `event` should reach a client of `user_id` subscribed to `projects`
pub fn should_deliver(event: &CollabEvent, user_id: &str, projects: &HashSet<String>) -> bool {
    if let Some(recipient) = event.recipient() {
        return recipient == user_id;
    }
    match event.project_id() {
        Some(project_id) => projects.contains(project_id),
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws
///
/// Accepts the session token as `?token=` (browsers cannot set headers on an
/// upgrade request) or as a bearer header.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    upgrade: Option<WebSocketUpgrade>,
) -> ApiResult<Response> {
    let token = params
        .token
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_bearer)
                .map(str::to_string)
        })
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    let user = sessions::user_for_token(&state.db, &token).await.map_err(|e| {
        warn!("WebSocket: rejected token: {}", e);
        ApiError::from(e)
    })?;

    let upgrade = upgrade
        .ok_or_else(|| ApiError::BadRequest("Expected a WebSocket upgrade request".to_string()))?;

    Ok(upgrade.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let client_id = state.clients.register(&user.id).await;
    info!("WebSocket: client {} connected as user {}", client_id, user.id);

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.event_bus.subscribe();

    let hello = ServerMessage::Connected {
        client_id,
        user_id: user.id.clone(),
    };
    if send_json(&mut sender, &hello).await.is_err() {
        state.clients.unregister(client_id).await;
        return;
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_client_message(&state, client_id, &user, &text).await;
                    if send_json(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Protocol-level ping/pong is answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket: client {} receive error: {}", client_id, e);
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if forward_event(&state, client_id, &user, &event, &mut sender).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket: client {} lagged, skipped {} events", client_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    state.clients.unregister(client_id).await;
    info!("WebSocket: client {} disconnected", client_id);
}

type WsSender = futures::stream::SplitSink<WebSocket, Message>;

async fn send_json<T: Serialize>(sender: &mut WsSender, value: &T) -> Result<(), axum::Error> {
    match serde_json::to_string(value) {
        Ok(text) => sender.send(Message::Text(text)).await,
        Err(e) => {
            warn!("WebSocket: failed to serialize frame: {}", e);
            Ok(())
        }
    }
}

async fn forward_event(
    state: &AppState,
    client_id: Uuid,
    user: &User,
    event: &CollabEvent,
    sender: &mut WsSender,
) -> Result<(), axum::Error> {
    let Some(client) = state.clients.get(client_id).await else {
        return Ok(());
    };

    if !should_deliver(event, &user.id, &client.projects) {
        return Ok(());
    }

    debug!("WebSocket: {} -> client {}", event.event_type(), client_id);
    send_json(sender, event).await?;

    if state.clients.revoke(client_id, event).await {
        debug!("WebSocket: client {} lost access to {:?}", client_id, event.project_id());
    }

    Ok(())
}

async fn handle_client_message(
    state: &AppState,
    client_id: Uuid,
    user: &User,
    text: &str,
) -> ServerMessage {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            }
        }
    };

    match message {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Subscribe { project_id } => {
            match team::get_membership(&state.db, &project_id, &user.id).await {
                Ok(Some(_)) => {
                    state.clients.subscribe(client_id, &project_id).await;
                    debug!("WebSocket: client {} subscribed to {}", client_id, project_id);
                    ServerMessage::Subscribed { project_id }
                }
                Ok(None) => ServerMessage::Error {
                    message: format!("Not a member of project {}", project_id),
                },
                Err(e) => {
                    warn!("WebSocket: membership lookup failed: {}", e);
                    ServerMessage::Error {
                        message: "Subscription failed".to_string(),
                    }
                }
            }
        }
        ClientMessage::Unsubscribe { project_id } => {
            state.clients.unsubscribe(client_id, &project_id).await;
            ServerMessage::Unsubscribed { project_id }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use colab_common::db::Notification;
    use colab_common::notify::NotificationKind;

    fn team_changed(project_id: &str) -> CollabEvent {
        CollabEvent::TeamChanged {
            project_id: project_id.to_string(),
            user_id: "u2".to_string(),
            added: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_project_events_need_subscription() {
        let mut projects = HashSet::new();
        assert!(!should_deliver(&team_changed("p1"), "u1", &projects));

        projects.insert("p1".to_string());
        assert!(should_deliver(&team_changed("p1"), "u1", &projects));
        assert!(!should_deliver(&team_changed("p2"), "u1", &projects));
    }

    fn notification_for(user_id: &str, project_id: &str) -> CollabEvent {
        CollabEvent::NotificationCreated {
            notification: Notification {
                id: "n1".to_string(),
                user_id: user_id.to_string(),
                project_id: Some(project_id.to_string()),
                kind: NotificationKind::CommentAdded,
                message: "Grace commented".to_string(),
                link: None,
                is_read: false,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_notifications_reach_only_their_recipient() {
        let mut projects = HashSet::new();
        assert!(should_deliver(&notification_for("u1", "p1"), "u1", &projects));
        assert!(!should_deliver(&notification_for("u2", "p1"), "u1", &projects));

        // Subscribing to the project does not expose other users' notifications
        projects.insert("p1".to_string());
        assert!(!should_deliver(&notification_for("u2", "p1"), "u1", &projects));
        assert!(should_deliver(&notification_for("u1", "p1"), "u1", &projects));
    }

    #[tokio::test]
    async fn test_removed_member_loses_subscription() {
        let registry = ClientRegistry::default();
        let removed = registry.register("u2").await;
        let other = registry.register("u1").await;
        registry.subscribe(removed, "p1").await;
        registry.subscribe(other, "p1").await;

        // Someone joining changes nothing
        assert!(!registry.revoke(removed, &team_changed("p1")).await);

        let removal = CollabEvent::TeamChanged {
            project_id: "p1".to_string(),
            user_id: "u2".to_string(),
            added: false,
            timestamp: Utc::now(),
        };
        assert!(registry.revoke(removed, &removal).await);
        assert!(!registry.revoke(other, &removal).await);

        assert!(!registry.get(removed).await.unwrap().projects.contains("p1"));
        assert!(registry.get(other).await.unwrap().projects.contains("p1"));

        let deleted = CollabEvent::ProjectDeleted {
            project_id: "p1".to_string(),
            timestamp: Utc::now(),
        };
        assert!(registry.revoke(other, &deleted).await);
        assert!(registry.get(other).await.unwrap().projects.is_empty());
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","project_id":"p1"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { project_id } if project_id == "p1"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shout"}"#).is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let json = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(json["type"], "pong");

        let json = serde_json::to_value(ServerMessage::Error {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }

    #[tokio::test]
    async fn test_registry_subscriptions() {
        let registry = ClientRegistry::default();
        let a = registry.register("u1").await;
        let b = registry.register("u2").await;
        assert_eq!(registry.count().await, 2);

        assert!(registry.subscribe(a, "p1").await);
        assert!(registry.subscribe(b, "p1").await);
        assert!(registry.unsubscribe(a, "p1").await);
        assert!(!registry.unsubscribe(a, "p1").await);

        let client_b = registry.get(b).await.unwrap();
        assert_eq!(client_b.user_id, "u2");
        assert!(client_b.projects.contains("p1"));

        registry.unregister(a).await;
        assert!(!registry.subscribe(a, "p1").await);
        assert_eq!(registry.count().await, 1);
    }
}
