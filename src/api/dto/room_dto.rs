//! Room DTOs: occupant snapshots and system messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EventType;
use crate::error::GatewayError;
use crate::hub::Occupant;

/// One user present in a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OccupantDto {
    /// Platform user id.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Avatar URL.
    pub avatar: String,
    /// `online`, `away`, `busy` or `offline`.
    pub status: String,
    /// Last activity of the session.
    pub last_seen: DateTime<Utc>,
}

impl From<Occupant> for OccupantDto {
    fn from(occupant: Occupant) -> Self {
        Self {
            user_id: occupant.user_id,
            username: occupant.username,
            avatar: occupant.avatar,
            status: occupant.status.to_string(),
            last_seen: occupant.last_seen,
        }
    }
}

/// Response body for `GET /rooms/{id}/users`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomUsersResponse {
    /// Room id.
    pub project_id: i64,
    /// Occupants, ordered by user id then join order.
    pub users: Vec<OccupantDto>,
    /// Number of sessions in the room.
    pub count: usize,
}

/// Request body for `POST /rooms/{id}/system-message`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SystemMessageRequest {
    /// Event tag. Defaults to `project_update`.
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    /// Human-readable message, merged into the payload as `message`.
    pub message: String,
    /// Extra payload fields. Must be a JSON object when present.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Option<serde_json::Value>,
}

impl SystemMessageRequest {
    /// Resolves the event tag and builds the payload.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an unknown tag or a
    /// non-object `data`.
    pub fn into_event(self) -> Result<(EventType, serde_json::Value), GatewayError> {
        let event_type = match self.event_type.as_deref() {
            None => EventType::ProjectUpdate,
            Some(tag) => tag
                .parse()
                .map_err(|e: crate::domain::UnknownEventType| GatewayError::InvalidRequest(e.to_string()))?,
        };

        let mut payload = match self.data {
            None | Some(serde_json::Value::Null) => serde_json::Map::new(),
            Some(serde_json::Value::Object(map)) => map,
            Some(_) => {
                return Err(GatewayError::InvalidRequest(
                    "data must be a JSON object".to_string(),
                ));
            }
        };
        payload.insert("message".to_string(), serde_json::Value::String(self.message));

        Ok((event_type, serde_json::Value::Object(payload)))
    }
}

/// Response body for `POST /rooms/{id}/system-message`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemMessageResponse {
    /// Number of sessions the event was queued for.
    pub delivered: usize,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request(event_type: Option<&str>, data: Option<serde_json::Value>) -> SystemMessageRequest {
        SystemMessageRequest {
            event_type: event_type.map(str::to_string),
            message: "deploy finished".to_string(),
            data,
        }
    }

    #[test]
    fn type_defaults_to_project_update() {
        let Ok((event_type, payload)) = request(None, None).into_event() else {
            panic!("request should be valid");
        };
        assert_eq!(event_type, EventType::ProjectUpdate);
        assert_eq!(payload, serde_json::json!({"message": "deploy finished"}));
    }

    #[test]
    fn message_is_merged_into_data() {
        let data = serde_json::json!({"build": 12, "message": "overwritten"});
        let Ok((event_type, payload)) = request(Some("task_update"), Some(data)).into_event() else {
            panic!("request should be valid");
        };
        assert_eq!(event_type, EventType::TaskUpdate);
        assert_eq!(
            payload,
            serde_json::json!({"build": 12, "message": "deploy finished"})
        );
    }

    #[test]
    fn unknown_type_and_scalar_data_are_rejected() {
        assert!(matches!(
            request(Some("file_upload"), None).into_event(),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            request(None, Some(serde_json::json!([1, 2]))).into_event(),
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
