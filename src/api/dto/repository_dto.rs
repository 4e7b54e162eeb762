//! Repository DTOs for create, update, delete and branch operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::persistence::{RepositoryPatch, RepositoryRecord};
use crate::service::{BranchCreated, CreateBranch, CreateRepository};

/// Request body for `POST /projects/{project_id}/repositories`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRepositoryRequest {
    /// Repository name: 1 to 100 characters of `[A-Za-z0-9._-]`.
    pub name: String,
    /// Free-form description (max 500 chars).
    #[serde(default)]
    pub description: String,
    /// Initial default branch. Defaults to `main`.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
}

impl From<CreateRepositoryRequest> for CreateRepository {
    fn from(req: CreateRepositoryRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            default_branch: req.default_branch,
            private: req.private,
        }
    }
}

/// Request body for `PATCH /repositories/{id}`. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRepositoryRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// New visibility.
    #[serde(default)]
    pub private: Option<bool>,
}

impl From<UpdateRepositoryRequest> for RepositoryPatch {
    fn from(req: UpdateRepositoryRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            default_branch: req.default_branch,
            private: req.private,
        }
    }
}

/// Request body for `POST /repositories/{id}/branches`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBranchRequest {
    /// Branch name.
    pub name: String,
    /// Source branch. Defaults to the repository's default branch.
    #[serde(default)]
    pub from: Option<String>,
    /// Make the new branch the repository default.
    #[serde(default)]
    pub make_default: bool,
}

impl From<CreateBranchRequest> for CreateBranch {
    fn from(req: CreateBranchRequest) -> Self {
        Self {
            name: req.name,
            from: req.from,
            make_default: req.make_default,
        }
    }
}

/// A repository as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RepositoryResponse {
    /// Repository id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Repository name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Default branch.
    pub default_branch: String,
    /// Visibility.
    pub private: bool,
    /// Git gateway id, once linked.
    pub remote_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<RepositoryRecord> for RepositoryResponse {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id.get(),
            name: record.name,
            description: record.description,
            default_branch: record.default_branch,
            private: record.private,
            remote_id: record.remote_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response body for `POST /repositories/{id}/branches` (201 Created).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BranchResponse {
    /// Branch name.
    pub name: String,
    /// Head commit reported by the Git gateway.
    pub commit: Option<String>,
    /// Repository after the operation.
    pub repository: RepositoryResponse,
}

impl From<BranchCreated> for BranchResponse {
    fn from(created: BranchCreated) -> Self {
        Self {
            name: created.branch.name,
            commit: created.branch.commit,
            repository: created.repository.into(),
        }
    }
}
