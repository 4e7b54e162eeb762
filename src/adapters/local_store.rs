//! Contract for the owning service's relational state.
//!
//! Writes go through a [`LocalTx`] obtained from [`LocalStore::begin`].
//! [`within_local_transaction`] scopes one so that its effects are
//! all-or-nothing: committed when the closure returns `Ok`, rolled back when
//! it returns `Err`, and rolled back on drop for every other exit path
//! (cancellation, panic unwinding).

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::domain::ProjectId;
use crate::error::StepError;
use crate::persistence::models::{NewRepository, RepositoryPatch, RepositoryRecord};

/// Read access and transaction factory for the local store.
#[async_trait]
pub trait LocalStore: Send + Sync + std::fmt::Debug {
    /// Opens a local transaction.
    async fn begin(&self) -> Result<Box<dyn LocalTx>, StepError>;

    /// Loads a repository row.
    async fn find_repository(&self, id: i64) -> Result<Option<RepositoryRecord>, StepError>;

    /// Counts the repositories of a project.
    async fn count_repositories(&self, project_id: ProjectId) -> Result<u64, StepError>;
}

/// An open local transaction. Dropping it without [`LocalTx::commit`]
/// discards every write.
#[async_trait]
pub trait LocalTx: Send {
    /// Inserts a row. Fails with `Conflict` if the name is taken in the project.
    async fn insert_repository(
        &mut self,
        new: &NewRepository,
    ) -> Result<RepositoryRecord, StepError>;

    /// Applies a patch. Fails with `NotFound` if the row is missing.
    async fn update_repository(
        &mut self,
        id: i64,
        patch: &RepositoryPatch,
    ) -> Result<RepositoryRecord, StepError>;

    /// Sets or clears the gateway identifier. Fails with `NotFound` if the
    /// row is missing.
    async fn set_remote_id(&mut self, id: i64, remote_id: Option<&str>) -> Result<(), StepError>;

    /// Deletes a row and returns it. Fails with `NotFound` if it is missing.
    async fn delete_repository(&mut self, id: i64) -> Result<RepositoryRecord, StepError>;

    /// Re-inserts a previously deleted row with its original id, replacing
    /// any row with that id.
    async fn restore_repository(&mut self, record: &RepositoryRecord) -> Result<(), StepError>;

    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> Result<(), StepError>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> Result<(), StepError>;
}

/// Runs `work` inside a local transaction.
///
/// ```ignore
/// let row = within_local_transaction(store, move |tx| {
///     Box::pin(async move { tx.insert_repository(&new).await })
/// })
/// .await?;
/// ```
///
/// # Errors
///
/// Returns the error of `work` (after rolling back), or the error of
/// [`LocalStore::begin`] / [`LocalTx::commit`].
pub async fn within_local_transaction<T, F>(store: &dyn LocalStore, work: F) -> Result<T, StepError>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn LocalTx) -> BoxFuture<'t, Result<T, StepError>> + Send,
{
    let mut tx = store.begin().await?;
    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "local rollback failed");
            }
            Err(err)
        }
    }
}
