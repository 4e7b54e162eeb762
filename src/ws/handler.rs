//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use super::messages::ConnectQuery;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// `GET /ws?user_id=..&username=..&project_id=..[&avatar=..]`
///
/// The query is validated before the upgrade; an invalid handshake is
/// answered with `400` and never reaches the hub.
pub async fn ws_handler(
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    let init = query.into_session_init()?;
    if state.hub.is_stopped() {
        return Err(GatewayError::Unavailable("collaboration hub stopped".to_string()));
    }
    let hub = state.hub.clone();
    let settings = state.ws_settings;

    Ok(ws
        .on_upgrade(move |socket| run_connection(socket, hub, init, settings))
        .into_response())
}
