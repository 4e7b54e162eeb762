//! HTTP API layer: route handlers, DTOs, OpenAPI document and router
//! composition.
//!
//! Repository endpoints are mounted under `/api/v1`; health and room
//! endpoints live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "devhub-gateway", description = "Repository workflows and collaboration rooms"),
    paths(
        handlers::system::health_handler,
        handlers::rooms::room_users,
        handlers::rooms::system_message,
        handlers::repositories::create_repository,
        handlers::repositories::get_repository,
        handlers::repositories::update_repository,
        handlers::repositories::delete_repository,
        handlers::repositories::create_branch,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        dto::RoomUsersResponse,
        dto::OccupantDto,
        dto::SystemMessageRequest,
        dto::SystemMessageResponse,
        dto::CreateRepositoryRequest,
        dto::UpdateRepositoryRequest,
        dto::CreateBranchRequest,
        dto::RepositoryResponse,
        dto::BranchResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Rooms", description = "Collaboration rooms"),
        (name = "Repositories", description = "Coordinated repository workflows"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(handlers::rooms::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::adapters::{MemoryGitGateway, MemoryStore};
    use crate::app_state::build_app;
    use crate::hub::{Hub, HubConfig};
    use crate::service::RepositoryService;
    use crate::txn::Coordinator;

    fn state() -> AppState {
        AppState {
            hub: Hub::spawn(HubConfig::default()),
            repositories: Arc::new(RepositoryService::new(
                Coordinator::default(),
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryGitGateway::new()),
            )),
            service_name: Arc::from("devhub-gateway"),
            ws_settings: crate::ws::ConnectionSettings::default(),
        }
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = build_app(state());
        let Ok(request) = Request::get(uri).body(Body::empty()) else {
            panic!("request should build");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let Ok(body) = serde_json::from_slice(&bytes) else {
            panic!("body should be JSON");
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_service_and_rooms() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "devhub-gateway");
        assert_eq!(body["rooms"], 0);
    }

    #[tokio::test]
    async fn unknown_room_and_repository_are_not_found() {
        let (status, body) = get("/rooms/12/users").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2002);

        let (status, body) = get("/api/v1/repositories/5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2001);
    }

    #[test]
    fn openapi_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/rooms/{id}/users",
            "/rooms/{id}/system-message",
            "/api/v1/projects/{project_id}/repositories",
            "/api/v1/repositories/{id}",
            "/api/v1/repositories/{id}/branches",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
