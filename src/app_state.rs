//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::hub::HubHandle;
use crate::service::RepositoryService;
use crate::ws::{ConnectionSettings, ws_handler};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Collaboration hub.
    pub hub: HubHandle,
    /// Coordinated repository workflows.
    pub repositories: Arc<RepositoryService>,
    /// Identity reported by `/health`.
    pub service_name: Arc<str>,
    /// Keepalive settings for new WebSocket connections.
    pub ws_settings: ConnectionSettings,
}

/// Builds the full application router: REST endpoints, the `/ws`
/// upgrade, request tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
