//! Repository endpoints. Every mutation runs as a coordinated transaction
//! across the local store and the Git gateway.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

use crate::api::dto::{
    BranchResponse, CreateBranchRequest, CreateRepositoryRequest, RepositoryResponse,
    UpdateRepositoryRequest,
};
use crate::app_state::AppState;
use crate::domain::ProjectId;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::RepositoryService;

/// Runs a workflow on its own task. Dropping the request cancels the
/// workflow, which still runs its compensations to completion.
async fn run_workflow<T, F, Fut>(state: &AppState, workflow: F) -> Result<T, GatewayError>
where
    F: FnOnce(Arc<RepositoryService>, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let task = tokio::spawn(workflow(Arc::clone(&state.repositories), cancel));
    task.await
        .map_err(|e| GatewayError::Internal(format!("workflow task failed: {e}")))?
}

/// `POST /projects/{project_id}/repositories`: Create a repository.
///
/// # Errors
///
/// Returns [`GatewayError`] on validation failure, a name conflict, or a
/// failed step; a failed step is rolled back before the response.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project_id}/repositories",
    tag = "Repositories",
    summary = "Create a repository",
    description = "Inserts the local row, creates the remote repository through the Git gateway, then links the two. Any failure compensates the completed steps.",
    params(("project_id" = i64, Path, description = "Owning project")),
    request_body = CreateRepositoryRequest,
    responses(
        (status = 201, description = "Repository created", body = RepositoryResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 502, description = "Git gateway failure, rolled back", body = ErrorResponse),
        (status = 500, description = "Rollback incomplete", body = ErrorResponse),
    )
)]
pub async fn create_repository(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateRepositoryRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = run_workflow(&state, |service, cancel| async move {
        service
            .create_repository(ProjectId::new(project_id), req.into(), &cancel)
            .await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(RepositoryResponse::from(record))))
}

/// `GET /repositories/{id}`: Fetch a repository.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the repository does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/repositories/{id}",
    tag = "Repositories",
    summary = "Get a repository",
    params(("id" = i64, Path, description = "Repository id")),
    responses(
        (status = 200, description = "Repository", body = RepositoryResponse),
        (status = 404, description = "Repository not found", body = ErrorResponse),
    )
)]
pub async fn get_repository(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.repositories.get_repository(id).await?;
    Ok(Json(RepositoryResponse::from(record)))
}

/// `PATCH /repositories/{id}`: Update repository settings.
///
/// # Errors
///
/// Returns [`GatewayError`] on validation failure, a missing repository,
/// or a failed step.
#[utoipa::path(
    patch,
    path = "/api/v1/repositories/{id}",
    tag = "Repositories",
    summary = "Update a repository",
    params(("id" = i64, Path, description = "Repository id")),
    request_body = UpdateRepositoryRequest,
    responses(
        (status = 200, description = "Repository updated", body = RepositoryResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Repository not found", body = ErrorResponse),
        (status = 502, description = "Git gateway failure, rolled back", body = ErrorResponse),
    )
)]
pub async fn update_repository(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRepositoryRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = run_workflow(&state, |service, cancel| async move {
        service.update_repository(id, req.into(), &cancel).await
    })
    .await?;
    Ok(Json(RepositoryResponse::from(record)))
}

/// `DELETE /repositories/{id}`: Delete a repository.
///
/// # Errors
///
/// Returns [`GatewayError`] on a missing repository or a failed step.
#[utoipa::path(
    delete,
    path = "/api/v1/repositories/{id}",
    tag = "Repositories",
    summary = "Delete a repository",
    params(("id" = i64, Path, description = "Repository id")),
    responses(
        (status = 204, description = "Repository deleted"),
        (status = 404, description = "Repository not found", body = ErrorResponse),
        (status = 502, description = "Git gateway failure, rolled back", body = ErrorResponse),
    )
)]
pub async fn delete_repository(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    run_workflow(&state, |service, cancel| async move {
        service.delete_repository(id, &cancel).await
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /repositories/{id}/branches`: Create a branch.
///
/// # Errors
///
/// Returns [`GatewayError`] on validation failure, a missing or unlinked
/// repository, or a failed step.
#[utoipa::path(
    post,
    path = "/api/v1/repositories/{id}/branches",
    tag = "Repositories",
    summary = "Create a branch",
    params(("id" = i64, Path, description = "Repository id")),
    request_body = CreateBranchRequest,
    responses(
        (status = 201, description = "Branch created", body = BranchResponse),
        (status = 400, description = "Invalid branch name", body = ErrorResponse),
        (status = 404, description = "Repository or source branch not found", body = ErrorResponse),
        (status = 409, description = "Branch exists or repository unlinked", body = ErrorResponse),
    )
)]
pub async fn create_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let created = run_workflow(&state, |service, cancel| async move {
        service.create_branch(id, req.into(), &cancel).await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(BranchResponse::from(created))))
}

/// Repository routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/repositories",
            post(create_repository),
        )
        .route(
            "/repositories/{id}",
            get(get_repository)
                .patch(update_repository)
                .delete(delete_repository),
        )
        .route("/repositories/{id}/branches", post(create_branch))
}
