//! Contract for the external Git-operations gateway.
//!
//! Operations come in inverse pairs (create/delete repository, create/delete
//! branch, update/update-back). Every create returns a stable identifier its
//! inverse accepts, and deleting an absent resource succeeds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ProjectId;
use crate::error::StepError;

/// Request to create a repository on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRemoteRepository {
    /// Owning project, used by the gateway for namespacing.
    pub project_id: ProjectId,
    /// Repository name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Initial default branch.
    pub default_branch: String,
    /// Whether the repository is private.
    pub private: bool,
}

/// Partial update of a gateway repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepositoryPatch {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New default branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// New visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

impl RemoteRepositoryPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.default_branch.is_none()
            && self.private.is_none()
    }
}

/// A repository as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Stable gateway identifier.
    pub id: String,
    /// Repository name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Default branch.
    pub default_branch: String,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Clone URL, if the gateway reports one.
    #[serde(default)]
    pub clone_url: Option<String>,
}

impl RemoteRepository {
    /// Returns a patch that would restore the fields `patch` is about to change.
    #[must_use]
    pub fn undo_patch(&self, patch: &RemoteRepositoryPatch) -> RemoteRepositoryPatch {
        RemoteRepositoryPatch {
            name: patch.name.as_ref().map(|_| self.name.clone()),
            description: patch.description.as_ref().map(|_| self.description.clone()),
            default_branch: patch
                .default_branch
                .as_ref()
                .map(|_| self.default_branch.clone()),
            private: patch.private.map(|_| self.private),
        }
    }
}

/// A branch as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBranch {
    /// Branch name.
    pub name: String,
    /// Head commit, if known.
    #[serde(default)]
    pub commit: Option<String>,
}

/// Operations the coordinator invokes on the Git gateway.
#[async_trait]
pub trait GitGateway: Send + Sync + std::fmt::Debug {
    /// Creates a repository and returns it with its stable id.
    async fn create_repository(
        &self,
        request: &CreateRemoteRepository,
    ) -> Result<RemoteRepository, StepError>;

    /// Fetches a repository.
    async fn get_repository(&self, remote_id: &str) -> Result<RemoteRepository, StepError>;

    /// Applies a partial update.
    async fn update_repository(
        &self,
        remote_id: &str,
        patch: &RemoteRepositoryPatch,
    ) -> Result<RemoteRepository, StepError>;

    /// Deletes a repository. Succeeds if it is already absent.
    async fn delete_repository(&self, remote_id: &str) -> Result<(), StepError>;

    /// Creates `branch` from `from`.
    async fn create_branch(
        &self,
        remote_id: &str,
        branch: &str,
        from: &str,
    ) -> Result<RemoteBranch, StepError>;

    /// Deletes a branch. Succeeds if it is already absent.
    async fn delete_branch(&self, remote_id: &str, branch: &str) -> Result<(), StepError>;
}
