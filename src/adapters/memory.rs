//! In-memory adapters.
//!
//! [`MemoryStore`] and [`MemoryGitGateway`] implement the adapter contracts
//! without external services. Both support failure injection and keep
//! enough bookkeeping (call journal, commit/rollback counters) to assert on
//! the coordinator's behavior. The binary uses [`MemoryStore`] when
//! persistence is disabled.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use super::git_gateway::{
    CreateRemoteRepository, GitGateway, RemoteBranch, RemoteRepository, RemoteRepositoryPatch,
};
use super::local_store::{LocalStore, LocalTx};
use crate::domain::ProjectId;
use crate::error::StepError;
use crate::persistence::models::{NewRepository, RepositoryPatch, RepositoryRecord};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Local store operation, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// [`LocalStore::begin`].
    Begin,
    /// [`LocalTx::insert_repository`].
    Insert,
    /// [`LocalTx::update_repository`].
    Update,
    /// [`LocalTx::set_remote_id`].
    SetRemoteId,
    /// [`LocalTx::delete_repository`].
    Delete,
    /// [`LocalTx::restore_repository`].
    Restore,
    /// [`LocalTx::commit`].
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    rows: BTreeMap<i64, RepositoryRecord>,
}

impl Tables {
    fn name_taken(&self, project_id: ProjectId, name: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|r| r.project_id == project_id && r.name == name && Some(r.id) != except)
    }
}

#[derive(Debug, Default)]
struct StoreBookkeeping {
    faults: Mutex<HashMap<StoreOp, StepError>>,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl StoreBookkeeping {
    fn check(&self, op: StoreOp) -> Result<(), StepError> {
        match lock(&self.faults).get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory [`LocalStore`].
///
/// Transactions are serialized: each holds the table lock for its lifetime
/// and works on a staged copy that replaces the tables on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<tokio::sync::Mutex<Tables>>,
    bookkeeping: Arc<StoreBookkeeping>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `op` fail with `error` until cleared.
    pub fn fail_on(&self, op: StoreOp, error: StepError) {
        lock(&self.bookkeeping.faults).insert(op, error);
    }

    /// Removes every injected failure.
    pub fn clear_faults(&self) {
        lock(&self.bookkeeping.faults).clear();
    }

    /// Snapshot of every committed row, ordered by id.
    pub async fn rows(&self) -> Vec<RepositoryRecord> {
        self.tables.lock().await.rows.values().cloned().collect()
    }

    /// Number of committed rows.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.rows.len()
    }

    /// Returns `true` if no rows are committed.
    pub async fn is_empty(&self) -> bool {
        self.tables.lock().await.rows.is_empty()
    }

    /// Number of committed local transactions.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.bookkeeping.commits.load(Ordering::SeqCst)
    }

    /// Number of rolled back (or dropped) local transactions.
    #[must_use]
    pub fn rollbacks(&self) -> u64 {
        self.bookkeeping.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LocalTx>, StepError> {
        self.bookkeeping.check(StoreOp::Begin)?;
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            bookkeeping: Arc::clone(&self.bookkeeping),
            finished: false,
        }))
    }

    async fn find_repository(&self, id: i64) -> Result<Option<RepositoryRecord>, StepError> {
        Ok(self.tables.lock().await.rows.get(&id).cloned())
    }

    async fn count_repositories(&self, project_id: ProjectId) -> Result<u64, StepError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rows
            .values()
            .filter(|r| r.project_id == project_id)
            .count() as u64)
    }
}

#[derive(Debug)]
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    bookkeeping: Arc<StoreBookkeeping>,
    finished: bool,
}

impl MemoryTx {
    fn row_mut(&mut self, id: i64) -> Result<&mut RepositoryRecord, StepError> {
        self.staged
            .rows
            .get_mut(&id)
            .ok_or_else(|| StepError::not_found(format!("repository {id}")))
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.bookkeeping.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl LocalTx for MemoryTx {
    async fn insert_repository(
        &mut self,
        new: &NewRepository,
    ) -> Result<RepositoryRecord, StepError> {
        self.bookkeeping.check(StoreOp::Insert)?;
        if self.staged.name_taken(new.project_id, &new.name, None) {
            return Err(StepError::conflict(format!(
                "repository `{}` already exists in project {}",
                new.name, new.project_id
            )));
        }
        self.staged.next_id += 1;
        let now = Utc::now();
        let record = RepositoryRecord {
            id: self.staged.next_id,
            project_id: new.project_id,
            name: new.name.clone(),
            description: new.description.clone(),
            default_branch: new.default_branch.clone(),
            private: new.private,
            remote_id: None,
            created_at: now,
            updated_at: now,
        };
        self.staged.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_repository(
        &mut self,
        id: i64,
        patch: &RepositoryPatch,
    ) -> Result<RepositoryRecord, StepError> {
        self.bookkeeping.check(StoreOp::Update)?;
        let project_id = self.row_mut(id)?.project_id;
        if let Some(name) = &patch.name
            && self.staged.name_taken(project_id, name, Some(id))
        {
            return Err(StepError::conflict(format!(
                "repository `{name}` already exists in project {project_id}"
            )));
        }
        let row = self.row_mut(id)?;
        patch.apply_to(row);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn set_remote_id(&mut self, id: i64, remote_id: Option<&str>) -> Result<(), StepError> {
        self.bookkeeping.check(StoreOp::SetRemoteId)?;
        let row = self.row_mut(id)?;
        row.remote_id = remote_id.map(str::to_string);
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_repository(&mut self, id: i64) -> Result<RepositoryRecord, StepError> {
        self.bookkeeping.check(StoreOp::Delete)?;
        self.staged
            .rows
            .remove(&id)
            .ok_or_else(|| StepError::not_found(format!("repository {id}")))
    }

    async fn restore_repository(&mut self, record: &RepositoryRecord) -> Result<(), StepError> {
        self.bookkeeping.check(StoreOp::Restore)?;
        self.staged.next_id = self.staged.next_id.max(record.id);
        self.staged.rows.insert(record.id, record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StepError> {
        let mut this = self;
        this.bookkeeping.check(StoreOp::Commit)?;
        *this.guard = std::mem::take(&mut this.staged);
        this.finished = true;
        this.bookkeeping.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StepError> {
        let mut this = self;
        this.finished = true;
        this.bookkeeping.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryGitGateway
// ---------------------------------------------------------------------------

/// Git gateway operation, for failure injection and call journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    /// [`GitGateway::create_repository`].
    CreateRepository,
    /// [`GitGateway::get_repository`].
    GetRepository,
    /// [`GitGateway::update_repository`].
    UpdateRepository,
    /// [`GitGateway::delete_repository`].
    DeleteRepository,
    /// [`GitGateway::create_branch`].
    CreateBranch,
    /// [`GitGateway::delete_branch`].
    DeleteBranch,
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    /// Operation invoked.
    pub op: GatewayOp,
    /// Repository id, branch path, or repository name for creates.
    pub target: String,
}

#[derive(Debug, Default)]
struct GatewayState {
    next_id: u64,
    repos: BTreeMap<String, (ProjectId, RemoteRepository)>,
    branches: BTreeMap<String, BTreeSet<String>>,
    faults: HashMap<GatewayOp, StepError>,
    delays: HashMap<GatewayOp, Duration>,
    calls: Vec<GatewayCall>,
}

/// In-memory [`GitGateway`].
#[derive(Debug, Clone, Default)]
pub struct MemoryGitGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MemoryGitGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `op` fail with `error` until cleared.
    pub fn fail_on(&self, op: GatewayOp, error: StepError) {
        lock(&self.state).faults.insert(op, error);
    }

    /// Delays every subsequent `op` by `delay` before it takes effect.
    pub fn delay_on(&self, op: GatewayOp, delay: Duration) {
        lock(&self.state).delays.insert(op, delay);
    }

    /// Removes every injected failure and delay.
    pub fn clear_faults(&self) {
        let mut state = lock(&self.state);
        state.faults.clear();
        state.delays.clear();
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn call_count(&self, op: GatewayOp) -> usize {
        lock(&self.state).calls.iter().filter(|c| c.op == op).count()
    }

    /// Returns the repository with the given id, if it exists.
    #[must_use]
    pub fn repository(&self, remote_id: &str) -> Option<RemoteRepository> {
        lock(&self.state).repos.get(remote_id).map(|(_, r)| r.clone())
    }

    /// Number of existing repositories.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        lock(&self.state).repos.len()
    }

    /// Branch names of a repository.
    #[must_use]
    pub fn branches(&self, remote_id: &str) -> Vec<String> {
        lock(&self.state)
            .branches
            .get(remote_id)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn enter(&self, op: GatewayOp, target: &str) -> Result<(), StepError> {
        let (fault, delay) = {
            let mut state = lock(&self.state);
            state.calls.push(GatewayCall {
                op,
                target: target.to_string(),
            });
            (state.faults.get(&op).cloned(), state.delays.get(&op).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        fault.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl GitGateway for MemoryGitGateway {
    async fn create_repository(
        &self,
        request: &CreateRemoteRepository,
    ) -> Result<RemoteRepository, StepError> {
        self.enter(GatewayOp::CreateRepository, &request.name).await?;
        let mut state = lock(&self.state);
        let taken = state
            .repos
            .values()
            .any(|(project, r)| *project == request.project_id && r.name == request.name);
        if taken {
            return Err(StepError::conflict(format!(
                "remote repository `{}` already exists",
                request.name
            )));
        }
        state.next_id += 1;
        let repo = RemoteRepository {
            id: format!("repo-{}", state.next_id),
            name: request.name.clone(),
            description: request.description.clone(),
            default_branch: request.default_branch.clone(),
            private: request.private,
            clone_url: Some(format!(
                "memory://{}/{}.git",
                request.project_id, request.name
            )),
        };
        state
            .branches
            .insert(repo.id.clone(), BTreeSet::from([repo.default_branch.clone()]));
        state
            .repos
            .insert(repo.id.clone(), (request.project_id, repo.clone()));
        Ok(repo)
    }

    async fn get_repository(&self, remote_id: &str) -> Result<RemoteRepository, StepError> {
        self.enter(GatewayOp::GetRepository, remote_id).await?;
        self.repository(remote_id)
            .ok_or_else(|| StepError::not_found(format!("remote repository {remote_id}")))
    }

    async fn update_repository(
        &self,
        remote_id: &str,
        patch: &RemoteRepositoryPatch,
    ) -> Result<RemoteRepository, StepError> {
        self.enter(GatewayOp::UpdateRepository, remote_id).await?;
        let mut state = lock(&self.state);
        let Some((_, repo)) = state.repos.get_mut(remote_id) else {
            return Err(StepError::not_found(format!("remote repository {remote_id}")));
        };
        if let Some(name) = &patch.name {
            repo.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            repo.description.clone_from(description);
        }
        if let Some(branch) = &patch.default_branch {
            repo.default_branch.clone_from(branch);
        }
        if let Some(private) = patch.private {
            repo.private = private;
        }
        Ok(repo.clone())
    }

    async fn delete_repository(&self, remote_id: &str) -> Result<(), StepError> {
        self.enter(GatewayOp::DeleteRepository, remote_id).await?;
        let mut state = lock(&self.state);
        state.repos.remove(remote_id);
        state.branches.remove(remote_id);
        Ok(())
    }

    async fn create_branch(
        &self,
        remote_id: &str,
        branch: &str,
        from: &str,
    ) -> Result<RemoteBranch, StepError> {
        self.enter(GatewayOp::CreateBranch, &format!("{remote_id}/{branch}"))
            .await?;
        let mut state = lock(&self.state);
        let Some(branches) = state.branches.get_mut(remote_id) else {
            return Err(StepError::not_found(format!("remote repository {remote_id}")));
        };
        if !branches.contains(from) {
            return Err(StepError::not_found(format!("source branch `{from}`")));
        }
        if !branches.insert(branch.to_string()) {
            return Err(StepError::conflict(format!("branch `{branch}` already exists")));
        }
        Ok(RemoteBranch {
            name: branch.to_string(),
            commit: None,
        })
    }

    async fn delete_branch(&self, remote_id: &str, branch: &str) -> Result<(), StepError> {
        self.enter(GatewayOp::DeleteBranch, &format!("{remote_id}/{branch}"))
            .await?;
        let mut state = lock(&self.state);
        if let Some(branches) = state.branches.get_mut(remote_id) {
            branches.remove(branch);
        }
        Ok(())
    }
}
