//! Transactions: an ordered list of steps with an observable status.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::step::Step;
use crate::error::{StepError, TransactionError};

/// Opaque transaction identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(uuid::Uuid);

impl TransactionId {
    /// Creates a new random id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a transaction.
///
/// ```text
/// pending -> committing -> committed
///                       \-> compensating -> aborted | failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Created, steps may still be added.
    Pending,
    /// Forward actions are running.
    Committing,
    /// Every forward action succeeded.
    Committed,
    /// A forward action failed; compensations are running.
    Compensating,
    /// Every compensation succeeded.
    Aborted,
    /// At least one compensation failed.
    Failed,
}

impl TxStatus {
    /// Returns `true` for states with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted | Self::Failed)
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Committing)
                | (Self::Committing, Self::Committed | Self::Compensating)
                | (Self::Compensating, Self::Aborted | Self::Failed)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Compensating => "compensating",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A multi-step business operation run by [`super::Coordinator`].
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    name: String,
    pub(crate) steps: Vec<Step>,
    pub(crate) current: usize,
    status: watch::Sender<TxStatus>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub(crate) fn new(name: String) -> Self {
        let (status, _) = watch::channel(TxStatus::Pending);
        Self {
            id: TransactionId::new(),
            name,
            steps: Vec::new(),
            current: 0,
            status,
            started_at: None,
            finished_at: None,
        }
    }

    /// Transaction id.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Business operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TxStatus {
        *self.status.borrow()
    }

    /// Returns a receiver that observes every status change, including
    /// those made while [`super::Coordinator::execute`] holds the
    /// transaction.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<TxStatus> {
        self.status.subscribe()
    }

    /// Registered steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Index of the step currently (or last) executing.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// Number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if no steps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time execution started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Time a terminal status was reached.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Appends a step.
    ///
    /// `forward` produces the step result; `compensate` receives that
    /// result back if a later step fails. Compensations should treat an
    /// already-absent target as success (return `Ok` or a `NotFound`
    /// error).
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Rejected`] if the transaction is no
    /// longer pending.
    pub fn add_step<T, F, FFut, C, CFut>(
        &mut self,
        name: impl Into<String>,
        forward: F,
        compensate: C,
    ) -> Result<&mut Self, TransactionError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> FFut + Send + 'static,
        FFut: Future<Output = Result<T, StepError>> + Send + 'static,
        C: FnOnce(T) -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        let name = name.into();
        if self.status() != TxStatus::Pending {
            return Err(TransactionError::Rejected(StepError::validation(format!(
                "cannot add step `{name}` to {} transaction {}",
                self.status(),
                self.id
            ))));
        }
        self.steps.push(Step::new(name, forward, compensate));
        Ok(self)
    }

    /// Appends a step whose compensation is the identity.
    ///
    /// Use for idempotent effects, or for the final step of a transaction
    /// where nothing runs after it.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Rejected`] if the transaction is no
    /// longer pending.
    pub fn add_irreversible_step<T, F, FFut>(
        &mut self,
        name: impl Into<String>,
        forward: F,
    ) -> Result<&mut Self, TransactionError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> FFut + Send + 'static,
        FFut: Future<Output = Result<T, StepError>> + Send + 'static,
    {
        self.add_step(name, forward, |_: T| async { Ok::<(), StepError>(()) })
    }

    /// Moves to `next`. Illegal transitions are ignored and return `false`.
    pub(crate) fn transition(&mut self, next: TxStatus) -> bool {
        let current = self.status();
        if !current.can_transition_to(next) {
            tracing::error!(tx_id = %self.id, %current, %next, "illegal transaction transition");
            return false;
        }
        self.status.send_replace(next);
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }

    /// Names of steps whose forward action succeeded.
    #[must_use]
    pub fn executed_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.executed())
            .map(|s| s.name().to_string())
            .collect()
    }
}

/// Summary of a committed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReport {
    /// Transaction id.
    pub id: TransactionId,
    /// Business operation name.
    pub name: String,
    /// Final status (always `committed` for a report).
    pub status: TxStatus,
    /// Steps whose forward action succeeded, in order.
    pub executed_steps: Vec<String>,
    /// Execution start.
    pub started_at: Option<DateTime<Utc>>,
    /// Execution end.
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&Transaction> for TransactionReport {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id(),
            name: tx.name().to_string(),
            status: tx.status(),
            executed_steps: tx.executed_steps(),
            started_at: tx.started_at(),
            finished_at: tx.finished_at(),
        }
    }
}
