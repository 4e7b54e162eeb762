//! Realtime collaboration events.
//!
//! Every frame exchanged with a collaboration client is a [`CollabEvent`]
//! tagged with an [`EventType`]. The payload is opaque to the hub except
//! for `user_status`, whose `status` field updates the sender's cached
//! presence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, UserIdentity};

/// Enumerated event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A task changed.
    TaskUpdate,
    /// A task was created.
    TaskCreate,
    /// A task was deleted.
    TaskDelete,
    /// A user joined the room (hub-synthesized).
    UserJoin,
    /// A user left the room (hub-synthesized).
    UserLeave,
    /// A user changed presence status.
    UserStatus,
    /// Project metadata changed.
    ProjectUpdate,
    /// Chat message.
    ChatMessage,
    /// Typing indicator.
    Typing,
    /// Client liveness signal; absorbed by the hub, never rebroadcast.
    Heartbeat,
}

impl EventType {
    /// Every known tag.
    pub const ALL: [Self; 10] = [
        Self::TaskUpdate,
        Self::TaskCreate,
        Self::TaskDelete,
        Self::UserJoin,
        Self::UserLeave,
        Self::UserStatus,
        Self::ProjectUpdate,
        Self::ChatMessage,
        Self::Typing,
        Self::Heartbeat,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TaskUpdate => "task_update",
            Self::TaskCreate => "task_create",
            Self::TaskDelete => "task_delete",
            Self::UserJoin => "user_join",
            Self::UserLeave => "user_leave",
            Self::UserStatus => "user_status",
            Self::ProjectUpdate => "project_update",
            Self::ChatMessage => "chat_message",
            Self::Typing => "typing",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Returns `true` for tags only the hub may produce.
    #[must_use]
    pub const fn is_membership(&self) -> bool {
        matches!(self, Self::UserJoin | Self::UserLeave)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a tag outside the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// An event as observed by recipients.
///
/// Serializes to the wire shape:
/// ```json
/// { "type": "chat_message", "project_id": 1,
///   "user_id": 7, "username": "ada", "avatar": "",
///   "data": {"message": "hi"}, "timestamp": "2026-01-01T00:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabEvent {
    /// Event tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Room the event belongs to.
    pub project_id: ProjectId,
    /// Origin fields as recorded by the hub.
    #[serde(flatten)]
    pub origin: UserIdentity,
    /// Opaque payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Server-assigned timestamp.
    pub timestamp: DateTime<Utc>,
}

impl CollabEvent {
    /// Creates an event stamped with the current server time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        project_id: ProjectId,
        origin: UserIdentity,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            project_id,
            origin,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Synthesizes a `user_join` event for `user`.
    #[must_use]
    pub fn user_join(project_id: ProjectId, user: &UserIdentity) -> Self {
        Self::new(
            EventType::UserJoin,
            project_id,
            user.clone(),
            serde_json::json!({ "message": format!("{} joined the project", user.username) }),
        )
    }

    /// Synthesizes a `user_leave` event for `user`.
    #[must_use]
    pub fn user_leave(project_id: ProjectId, user: &UserIdentity) -> Self {
        Self::new(
            EventType::UserLeave,
            project_id,
            user.clone(),
            serde_json::json!({ "message": format!("{} left the project", user.username) }),
        )
    }
}
