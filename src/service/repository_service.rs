//! Repository service: keeps the local `repositories` table consistent with
//! the Git gateway.
//!
//! Every write is a coordinated transaction whose steps are either local
//! (one local transaction each) or remote (one gateway call each), never
//! both, so that each step has a well-defined inverse.

use std::sync::{Arc, OnceLock};

use futures_util::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::adapters::{
    CreateRemoteRepository, GitGateway, LocalStore, RemoteBranch, RemoteRepository,
    RemoteRepositoryPatch, within_local_transaction,
};
use crate::domain::ProjectId;
use crate::error::{GatewayError, StepError};
use crate::persistence::models::{NewRepository, RepositoryPatch, RepositoryRecord};
use crate::txn::{Coordinator, Transaction, TransactionReport};

/// Maximum repository name length, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

const DEFAULT_BRANCH: &str = "main";

/// Input for [`RepositoryService::create_repository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepository {
    /// Repository name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Initial default branch; `main` when absent.
    pub default_branch: Option<String>,
    /// Whether the repository is private.
    pub private: bool,
}

/// Input for [`RepositoryService::create_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBranch {
    /// New branch name.
    pub name: String,
    /// Source branch; the repository default branch when absent.
    pub from: Option<String>,
    /// Whether the new branch becomes the default branch.
    pub make_default: bool,
}

/// Result of [`RepositoryService::create_branch`].
#[derive(Debug, Clone, Serialize)]
pub struct BranchCreated {
    /// Repository after the operation.
    pub repository: RepositoryRecord,
    /// Branch as reported by the gateway.
    pub branch: RemoteBranch,
}

/// Validates a repository name.
///
/// # Errors
///
/// Returns a `Validation` error unless the name has 1 to 100 characters
/// from `[A-Za-z0-9._-]` and does not start with `.`.
pub fn validate_repository_name(name: &str) -> Result<(), StepError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(StepError::validation(format!(
            "repository name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with('.') {
        return Err(StepError::validation("repository name must not start with `.`"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(StepError::validation(format!(
            "repository name contains invalid character `{bad}`"
        )));
    }
    Ok(())
}

/// Validates a repository description.
///
/// # Errors
///
/// Returns a `Validation` error if it exceeds 500 characters.
pub fn validate_description(description: &str) -> Result<(), StepError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(StepError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Validates a branch name.
///
/// # Errors
///
/// Returns a `Validation` error if the name is empty or contains
/// whitespace or `..`.
pub fn validate_branch_name(name: &str) -> Result<(), StepError> {
    if name.is_empty() {
        return Err(StepError::validation("branch name must not be empty"));
    }
    if name.chars().any(char::is_whitespace) || name.contains("..") {
        return Err(StepError::validation(format!("invalid branch name `{name}`")));
    }
    Ok(())
}

fn validate_patch(patch: &RepositoryPatch) -> Result<(), StepError> {
    if let Some(name) = &patch.name {
        validate_repository_name(name)?;
    }
    if let Some(description) = &patch.description {
        validate_description(description)?;
    }
    if let Some(branch) = &patch.default_branch {
        validate_branch_name(branch)?;
    }
    Ok(())
}

fn remote_patch(patch: &RepositoryPatch) -> RemoteRepositoryPatch {
    RemoteRepositoryPatch {
        name: patch.name.clone(),
        description: patch.description.clone(),
        default_branch: patch.default_branch.clone(),
        private: patch.private,
    }
}

fn slot_value<T: Clone>(slot: &OnceLock<T>, what: &str) -> Result<T, StepError> {
    slot.get()
        .cloned()
        .ok_or_else(|| StepError::local(format!("{what} was not produced by an earlier step")))
}

/// Orchestrates repository writes across the local store and the Git
/// gateway.
#[derive(Debug, Clone)]
pub struct RepositoryService {
    coordinator: Coordinator,
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn GitGateway>,
}

impl RepositoryService {
    /// Creates a new `RepositoryService`.
    #[must_use]
    pub fn new(
        coordinator: Coordinator,
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn GitGateway>,
    ) -> Self {
        Self {
            coordinator,
            store,
            gateway,
        }
    }

    /// Returns the coordinator used for every write.
    #[must_use]
    pub const fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Loads a repository.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the row does not exist.
    pub async fn get_repository(&self, id: i64) -> Result<RepositoryRecord, GatewayError> {
        self.store
            .find_repository(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("repository {id}")))
    }

    /// Creates a repository locally and on the gateway, then links them.
    ///
    /// Steps: `insert_local_row` → `create_remote_repository` →
    /// `link_remote_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] before any effect when the
    /// input is invalid, otherwise the error of the failed transaction.
    pub async fn create_repository(
        &self,
        project_id: ProjectId,
        request: CreateRepository,
        cancel: &CancellationToken,
    ) -> Result<RepositoryRecord, GatewayError> {
        validate_repository_name(&request.name)?;
        validate_description(&request.description)?;
        let default_branch = request
            .default_branch
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        validate_branch_name(&default_branch)?;

        let new = NewRepository {
            project_id,
            name: request.name,
            description: request.description,
            default_branch,
            private: request.private,
        };
        let remote_request = CreateRemoteRepository {
            project_id,
            name: new.name.clone(),
            description: new.description.clone(),
            default_branch: new.default_branch.clone(),
            private: new.private,
        };

        let inserted: Arc<OnceLock<RepositoryRecord>> = Arc::new(OnceLock::new());
        let created: Arc<OnceLock<RemoteRepository>> = Arc::new(OnceLock::new());
        let mut tx = self.coordinator.begin("create_repository");

        let store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        let slot = Arc::clone(&inserted);
        tx.add_step(
            "insert_local_row",
            move || async move {
                let row = within_local_transaction(store.as_ref(), move |ltx| {
                    async move { ltx.insert_repository(&new).await }.boxed()
                })
                .await?;
                let _ = slot.set(row.clone());
                Ok::<_, StepError>(row)
            },
            move |row: RepositoryRecord| async move {
                within_local_transaction(undo_store.as_ref(), move |ltx| {
                    async move { ltx.delete_repository(row.id).await.map(drop) }.boxed()
                })
                .await
            },
        )?;

        let gateway = Arc::clone(&self.gateway);
        let undo_gateway = Arc::clone(&self.gateway);
        let slot = Arc::clone(&created);
        tx.add_step(
            "create_remote_repository",
            move || async move {
                let remote = gateway.create_repository(&remote_request).await?;
                let _ = slot.set(remote.clone());
                Ok::<_, StepError>(remote)
            },
            move |remote: RemoteRepository| async move {
                undo_gateway.delete_repository(&remote.id).await
            },
        )?;

        let store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        let row_slot = Arc::clone(&inserted);
        let remote_slot = Arc::clone(&created);
        tx.add_step(
            "link_remote_id",
            move || async move {
                let row = slot_value(&row_slot, "local row")?;
                let remote = slot_value(&remote_slot, "remote repository")?;
                within_local_transaction(store.as_ref(), move |ltx| {
                    async move { ltx.set_remote_id(row.id, Some(&remote.id)).await }.boxed()
                })
                .await?;
                Ok::<_, StepError>(row.id)
            },
            move |id: i64| async move {
                within_local_transaction(undo_store.as_ref(), move |ltx| {
                    async move { ltx.set_remote_id(id, None).await }.boxed()
                })
                .await
            },
        )?;

        let report = self.run(&mut tx, cancel).await?;
        let id = slot_value(&inserted, "local row")?.id;
        let record = self.get_repository(id).await?;
        tracing::info!(
            tx_id = %report.id,
            %project_id,
            repository_id = record.id,
            remote_id = record.remote_id.as_deref().unwrap_or_default(),
            "repository created"
        );
        Ok(record)
    }

    /// Applies a partial update locally and, when linked, on the gateway.
    ///
    /// Steps: `update_local_row` → `update_remote_repository`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] or
    /// [`GatewayError::NotFound`] before any effect, otherwise the error
    /// of the failed transaction.
    pub async fn update_repository(
        &self,
        id: i64,
        patch: RepositoryPatch,
        cancel: &CancellationToken,
    ) -> Result<RepositoryRecord, GatewayError> {
        validate_patch(&patch)?;
        let current = self.get_repository(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let mut tx = self.coordinator.begin("update_repository");

        let store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        let local_patch = patch.clone();
        let restore = current.restoring_patch();
        tx.add_step(
            "update_local_row",
            move || async move {
                within_local_transaction(store.as_ref(), move |ltx| {
                    async move { ltx.update_repository(id, &local_patch).await }.boxed()
                })
                .await
            },
            move |_: RepositoryRecord| async move {
                within_local_transaction(undo_store.as_ref(), move |ltx| {
                    async move { ltx.update_repository(id, &restore).await.map(drop) }.boxed()
                })
                .await
            },
        )?;

        if let Some(remote_id) = current.remote_id.clone() {
            let gateway = Arc::clone(&self.gateway);
            let undo_gateway = Arc::clone(&self.gateway);
            let undo_remote_id = remote_id.clone();
            let forward_patch = remote_patch(&patch);
            tx.add_step(
                "update_remote_repository",
                move || async move {
                    let before = gateway.get_repository(&remote_id).await?;
                    gateway.update_repository(&remote_id, &forward_patch).await?;
                    Ok::<_, StepError>(before.undo_patch(&forward_patch))
                },
                move |undo: RemoteRepositoryPatch| async move {
                    undo_gateway
                        .update_repository(&undo_remote_id, &undo)
                        .await
                        .map(drop)
                },
            )?;
        }

        let report = self.run(&mut tx, cancel).await?;
        let record = self.get_repository(id).await?;
        tracing::info!(tx_id = %report.id, repository_id = id, "repository updated");
        Ok(record)
    }

    /// Deletes a repository locally, then on the gateway.
    ///
    /// Steps: `delete_local_row` → `delete_remote_repository`. The remote
    /// delete is the last step and has no inverse.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] before any effect, otherwise the
    /// error of the failed transaction.
    pub async fn delete_repository(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<RepositoryRecord, GatewayError> {
        let current = self.get_repository(id).await?;
        let mut tx = self.coordinator.begin("delete_repository");

        let store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        tx.add_step(
            "delete_local_row",
            move || async move {
                within_local_transaction(store.as_ref(), move |ltx| {
                    async move { ltx.delete_repository(id).await }.boxed()
                })
                .await
            },
            move |row: RepositoryRecord| async move {
                within_local_transaction(undo_store.as_ref(), move |ltx| {
                    async move { ltx.restore_repository(&row).await }.boxed()
                })
                .await
            },
        )?;

        if let Some(remote_id) = current.remote_id.clone() {
            let gateway = Arc::clone(&self.gateway);
            tx.add_irreversible_step("delete_remote_repository", move || async move {
                gateway.delete_repository(&remote_id).await
            })?;
        }

        let report = self.run(&mut tx, cancel).await?;
        tracing::info!(tx_id = %report.id, repository_id = id, "repository deleted");
        Ok(current)
    }

    /// Creates a branch on the gateway and optionally makes it the
    /// default branch.
    ///
    /// Steps: `create_remote_branch` → `set_default_branch`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`], [`GatewayError::NotFound`]
    /// or [`GatewayError::Conflict`] (repository not linked) before any
    /// effect, otherwise the error of the failed transaction.
    pub async fn create_branch(
        &self,
        id: i64,
        request: CreateBranch,
        cancel: &CancellationToken,
    ) -> Result<BranchCreated, GatewayError> {
        validate_branch_name(&request.name)?;
        if let Some(from) = &request.from {
            validate_branch_name(from)?;
        }
        let current = self.get_repository(id).await?;
        let Some(remote_id) = current.remote_id.clone() else {
            return Err(GatewayError::Conflict(format!(
                "repository {id} is not linked to the git gateway"
            )));
        };
        let from = request
            .from
            .unwrap_or_else(|| current.default_branch.clone());

        let branch_slot: Arc<OnceLock<RemoteBranch>> = Arc::new(OnceLock::new());
        let mut tx = self.coordinator.begin("create_branch");

        let gateway = Arc::clone(&self.gateway);
        let undo_gateway = Arc::clone(&self.gateway);
        let undo_remote_id = remote_id.clone();
        let branch_name = request.name.clone();
        let slot = Arc::clone(&branch_slot);
        tx.add_step(
            "create_remote_branch",
            move || async move {
                let branch = gateway.create_branch(&remote_id, &branch_name, &from).await?;
                let _ = slot.set(branch.clone());
                Ok::<_, StepError>(branch)
            },
            move |branch: RemoteBranch| async move {
                undo_gateway
                    .delete_branch(&undo_remote_id, &branch.name)
                    .await
            },
        )?;

        if request.make_default {
            let store = Arc::clone(&self.store);
            let undo_store = Arc::clone(&self.store);
            let patch = RepositoryPatch {
                default_branch: Some(request.name.clone()),
                ..RepositoryPatch::default()
            };
            let restore = RepositoryPatch {
                default_branch: Some(current.default_branch.clone()),
                ..RepositoryPatch::default()
            };
            tx.add_step(
                "set_default_branch",
                move || async move {
                    within_local_transaction(store.as_ref(), move |ltx| {
                        async move { ltx.update_repository(id, &patch).await }.boxed()
                    })
                    .await
                },
                move |_: RepositoryRecord| async move {
                    within_local_transaction(undo_store.as_ref(), move |ltx| {
                        async move { ltx.update_repository(id, &restore).await.map(drop) }.boxed()
                    })
                    .await
                },
            )?;
        }

        let report = self.run(&mut tx, cancel).await?;
        let branch = slot_value(&branch_slot, "remote branch")?;
        let repository = self.get_repository(id).await?;
        tracing::info!(
            tx_id = %report.id,
            repository_id = id,
            branch = %branch.name,
            "branch created"
        );
        Ok(BranchCreated { repository, branch })
    }

    async fn run(
        &self,
        tx: &mut Transaction,
        cancel: &CancellationToken,
    ) -> Result<TransactionReport, GatewayError> {
        Ok(self.coordinator.execute(tx, cancel).await?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::adapters::{GatewayOp, MemoryGitGateway, MemoryStore, StoreOp};

    struct Fixture {
        service: RepositoryService,
        store: MemoryStore,
        gateway: MemoryGitGateway,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let gateway = MemoryGitGateway::new();
        let service = RepositoryService::new(
            Coordinator::default(),
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
        );
        Fixture {
            service,
            store,
            gateway,
        }
    }

    fn request(name: &str) -> CreateRepository {
        CreateRepository {
            name: name.to_string(),
            description: "service".to_string(),
            default_branch: None,
            private: false,
        }
    }

    async fn created(fx: &Fixture, name: &str) -> RepositoryRecord {
        let result = fx
            .service
            .create_repository(ProjectId::new(1), request(name), &CancellationToken::new())
            .await;
        let Ok(record) = result else {
            panic!("create failed: {result:?}");
        };
        record
    }

    #[tokio::test]
    async fn create_commits_and_links_remote() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        let Some(remote_id) = record.remote_id.clone() else {
            panic!("row should be linked");
        };
        assert_eq!(record.default_branch, "main");
        assert!(fx.gateway.repository(&remote_id).is_some());
        assert_eq!(fx.store.len().await, 1);
        assert_eq!(fx.gateway.call_count(GatewayOp::DeleteRepository), 0);
    }

    #[tokio::test]
    async fn remote_create_failure_removes_local_row() {
        let fx = fixture();
        created(&fx, "web").await;
        assert_eq!(fx.store.count_repositories(ProjectId::new(1)).await, Ok(1));

        fx.gateway
            .fail_on(GatewayOp::CreateRepository, StepError::remote("gateway down"));
        let result = fx
            .service
            .create_repository(ProjectId::new(1), request("api"), &CancellationToken::new())
            .await;
        let Err(GatewayError::RemoteFailure(_)) = result else {
            panic!("expected remote failure, got {result:?}");
        };
        assert_eq!(fx.store.count_repositories(ProjectId::new(1)).await, Ok(1));
        assert_eq!(fx.gateway.call_count(GatewayOp::DeleteRepository), 0);
    }

    #[tokio::test]
    async fn failed_remote_compensation_is_reported() {
        let fx = fixture();
        fx.store
            .fail_on(StoreOp::SetRemoteId, StepError::local("constraint violated"));
        fx.gateway
            .fail_on(GatewayOp::DeleteRepository, StepError::remote("gateway down"));
        let result = fx
            .service
            .create_repository(ProjectId::new(1), request("api"), &CancellationToken::new())
            .await;
        let Err(GatewayError::CompensationFailed { compensations, .. }) = result else {
            panic!("expected compensation failure, got {result:?}");
        };
        let failed: Vec<&str> = compensations
            .iter()
            .filter(|c| c.is_failure())
            .map(|c| c.step.as_str())
            .collect();
        assert_eq!(failed, vec!["create_remote_repository"]);
        assert!(fx.store.is_empty().await);
        assert_eq!(fx.gateway.repository_count(), 1);
    }

    #[tokio::test]
    async fn invalid_input_has_no_effect() {
        let fx = fixture();
        for name in ["", ".hidden", "has space", "slash/name"] {
            let result = fx
                .service
                .create_repository(ProjectId::new(1), request(name), &CancellationToken::new())
                .await;
            let Err(GatewayError::InvalidRequest(_)) = result else {
                panic!("`{name}` should be rejected");
            };
        }
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(fx.store.commits(), 0);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_before_remote_call() {
        let fx = fixture();
        created(&fx, "api").await;
        let result = fx
            .service
            .create_repository(ProjectId::new(1), request("api"), &CancellationToken::new())
            .await;
        let Err(GatewayError::Conflict(_)) = result else {
            panic!("expected conflict, got {result:?}");
        };
        assert_eq!(fx.gateway.call_count(GatewayOp::CreateRepository), 1);
        assert_eq!(fx.store.len().await, 1);
    }

    #[tokio::test]
    async fn remote_update_failure_restores_local_fields() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        fx.gateway
            .fail_on(GatewayOp::UpdateRepository, StepError::remote("timeout"));
        let patch = RepositoryPatch {
            description: Some("changed".to_string()),
            private: Some(true),
            ..RepositoryPatch::default()
        };
        let result = fx
            .service
            .update_repository(record.id, patch, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GatewayError::RemoteFailure(_))));
        let Ok(Some(row)) = fx.store.find_repository(record.id).await else {
            panic!("row should still exist");
        };
        assert_eq!(row.description, "service");
        assert!(!row.private);
    }

    #[tokio::test]
    async fn update_applies_to_both_sides() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        let patch = RepositoryPatch {
            name: Some("api-v2".to_string()),
            ..RepositoryPatch::default()
        };
        let Ok(updated) = fx
            .service
            .update_repository(record.id, patch, &CancellationToken::new())
            .await
        else {
            panic!("update failed");
        };
        assert_eq!(updated.name, "api-v2");
        let Some(remote) = record.remote_id.as_deref().and_then(|id| fx.gateway.repository(id))
        else {
            panic!("remote missing");
        };
        assert_eq!(remote.name, "api-v2");
    }

    #[tokio::test]
    async fn failed_remote_delete_restores_row() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        fx.gateway
            .fail_on(GatewayOp::DeleteRepository, StepError::remote("gateway down"));
        let result = fx
            .service
            .delete_repository(record.id, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GatewayError::RemoteFailure(_))));
        let Ok(Some(row)) = fx.store.find_repository(record.id).await else {
            panic!("row should be restored");
        };
        assert_eq!(row.remote_id, record.remote_id);
    }

    #[tokio::test]
    async fn delete_removes_both_sides() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        let result = fx
            .service
            .delete_repository(record.id, &CancellationToken::new())
            .await;
        assert!(result.is_ok());
        assert!(fx.store.is_empty().await);
        assert_eq!(fx.gateway.repository_count(), 0);

        let again = fx
            .service
            .delete_repository(record.id, &CancellationToken::new())
            .await;
        assert!(matches!(again, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn branch_becomes_default_when_requested() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        let request = CreateBranch {
            name: "develop".to_string(),
            from: None,
            make_default: true,
        };
        let Ok(created) = fx
            .service
            .create_branch(record.id, request, &CancellationToken::new())
            .await
        else {
            panic!("branch create failed");
        };
        assert_eq!(created.branch.name, "develop");
        assert_eq!(created.repository.default_branch, "develop");
    }

    #[tokio::test]
    async fn failed_default_switch_deletes_branch() {
        let fx = fixture();
        let record = created(&fx, "api").await;
        fx.store.fail_on(StoreOp::Update, StepError::local("disk full"));
        let request = CreateBranch {
            name: "develop".to_string(),
            from: Some("main".to_string()),
            make_default: true,
        };
        let result = fx
            .service
            .create_branch(record.id, request, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GatewayError::PersistenceError(_))));
        let Some(remote_id) = record.remote_id.as_deref() else {
            panic!("row should be linked");
        };
        assert_eq!(fx.gateway.branches(remote_id), vec!["main"]);
    }

    #[tokio::test]
    async fn cancelled_operation_rolls_back() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fx
            .service
            .create_repository(ProjectId::new(1), request("api"), &cancel)
            .await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
        assert!(fx.store.is_empty().await);
    }

    #[test]
    fn branch_names_reject_spaces_and_dot_dot() {
        assert!(validate_branch_name("feature/x").is_ok());
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("a b").is_err());
        assert!(validate_branch_name("a..b").is_err());
        assert!(validate_description(&"x".repeat(501)).is_err());
        assert!(validate_repository_name(&"a".repeat(100)).is_ok());
        assert!(validate_repository_name(&"a".repeat(101)).is_err());
    }
}
