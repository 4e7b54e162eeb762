//! WebSocket framing: handshake parameters and JSON frames.
//!
//! Inbound and outbound frames share the [`CollabEvent`] wire shape. Only
//! `type` and `data` are read from an inbound frame; origin fields,
//! `project_id` and `timestamp` are ignored and set by the hub.

use serde::Deserialize;

use crate::domain::{
    CollabEvent, EventType, ProjectId, SYSTEM_USER_ID, UnknownEventType, UserIdentity,
};
use crate::error::GatewayError;
use crate::hub::SessionInit;

/// Query parameters of the upgrade request.
///
/// Every field is optional at the type level so that a missing or
/// malformed value is reported by [`ConnectQuery::into_session_init`]
/// instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    /// Platform user id (integer).
    pub user_id: Option<String>,
    /// Display name (non-empty).
    pub username: Option<String>,
    /// Room to join (integer).
    pub project_id: Option<String>,
    /// Avatar URL.
    pub avatar: Option<String>,
}

impl ConnectQuery {
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `user_id`, `username`
    /// or `project_id` is missing or malformed, or if `user_id` is the
    /// reserved system id.
    pub fn into_session_init(self) -> Result<SessionInit, GatewayError> {
        let user_id = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("user_id is required".to_string()))?
            .parse::<i64>()
            .map_err(|_| GatewayError::InvalidRequest("user_id must be an integer".to_string()))?;
        if user_id == SYSTEM_USER_ID {
            return Err(GatewayError::InvalidRequest(format!(
                "user_id {SYSTEM_USER_ID} is reserved"
            )));
        }

        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("username is required".to_string()))?
            .to_string();

        let project_id = self
            .project_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("project_id is required".to_string()))?
            .parse::<ProjectId>()
            .map_err(|_| GatewayError::InvalidRequest("project_id must be an integer".to_string()))?;

        Ok(SessionInit {
            project_id,
            identity: UserIdentity::new(user_id, username, self.avatar.unwrap_or_default()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Event tag.
    pub event_type: EventType,
    /// Payload, passed through unchanged.
    pub data: serde_json::Value,
}

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not a JSON object with a string `type`.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// `type` is not a known tag.
    #[error(transparent)]
    UnknownType(#[from] UnknownEventType),
}

/// Decodes an inbound text frame.
///
/// # Errors
///
/// Returns a [`FrameError`] for malformed JSON or an unknown tag. The
/// connection stays open either way.
pub fn decode_inbound(text: &str) -> Result<InboundFrame, FrameError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    Ok(InboundFrame {
        event_type: raw.event_type.parse()?,
        data: raw.data,
    })
}

/// Encodes an outbound event as a text frame.
///
/// # Errors
///
/// Returns the serializer error; not expected for well-formed events.
pub fn encode_outbound(event: &CollabEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
