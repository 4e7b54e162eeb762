//! Collaboration room endpoints: occupant snapshot and system messages.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{OccupantDto, RoomUsersResponse, SystemMessageRequest, SystemMessageResponse};
use crate::app_state::AppState;
use crate::domain::ProjectId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /rooms/{id}/users`: Users currently in a project room.
///
/// # Errors
///
/// Returns [`GatewayError::RoomNotFound`] if nobody is connected to the
/// project.
#[utoipa::path(
    get,
    path = "/rooms/{id}/users",
    tag = "Rooms",
    summary = "List room occupants",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Occupant snapshot", body = RoomUsersResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_users(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let project_id = ProjectId::new(id);
    let users: Vec<OccupantDto> = state
        .hub
        .room_occupants(project_id)
        .await?
        .into_iter()
        .map(OccupantDto::from)
        .collect();

    Ok(Json(RoomUsersResponse {
        project_id: id,
        count: users.len(),
        users,
    }))
}

/// `POST /rooms/{id}/system-message`: Inject a system event into a room.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an unknown, membership or
/// heartbeat type, and [`GatewayError::RoomNotFound`] if the room does not
/// exist.
#[utoipa::path(
    post,
    path = "/rooms/{id}/system-message",
    tag = "Rooms",
    summary = "Post a system message",
    description = "Broadcasts an event authored by the system identity to every session in the room.",
    params(("id" = i64, Path, description = "Project id")),
    request_body = SystemMessageRequest,
    responses(
        (status = 200, description = "Message queued", body = SystemMessageResponse),
        (status = 400, description = "Invalid event type or payload", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn system_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SystemMessageRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let (event_type, data) = req.into_event()?;
    let delivered = state
        .hub
        .post_system_event(ProjectId::new(id), event_type, data)
        .await?;
    tracing::info!(project_id = id, %event_type, delivered, "system message posted");

    Ok((StatusCode::OK, Json(SystemMessageResponse { delivered })))
}

/// Room routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{id}/users", get(room_users))
        .route("/rooms/{id}/system-message", post(system_message))
}
