//! Transaction coordinator: runs steps in order and compensates on failure.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::compensation::CompensationRegistry;
use super::step::{BoxedForward, StepSuccess};
use super::transaction::{Transaction, TransactionReport, TxStatus};
use crate::error::{StepError, TransactionError};

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on a single forward action. `None` disables the bound.
    pub step_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            step_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Runs [`Transaction`]s.
///
/// Stateless across transactions: it holds only configuration, so any
/// number of transactions may execute concurrently through clones of the
/// same coordinator without observing each other.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Creates a coordinator.
    #[must_use]
    pub const fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Returns the coordinator configuration.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Creates a new pending transaction.
    #[must_use]
    pub fn begin(&self, name: impl Into<String>) -> Transaction {
        let tx = Transaction::new(name.into());
        tracing::debug!(tx_id = %tx.id(), name = tx.name(), "transaction begun");
        tx
    }

    /// Executes every step of `tx` in order.
    ///
    /// On the first forward failure, or on cancellation observed between
    /// steps or during a forward action, every previously successful step
    /// is compensated in reverse order. Compensations always run to
    /// completion and are not subject to `cancel`.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::Rejected`] if `tx` is not pending.
    /// - [`TransactionError::Aborted`] if a step failed and every
    ///   compensation succeeded (status `aborted`).
    /// - [`TransactionError::Failed`] if a step failed and at least one
    ///   compensation failed too (status `failed`).
    pub async fn execute(
        &self,
        tx: &mut Transaction,
        cancel: &CancellationToken,
    ) -> Result<TransactionReport, TransactionError> {
        if tx.status() != TxStatus::Pending {
            return Err(TransactionError::Rejected(StepError::validation(format!(
                "transaction {} is {}, not pending",
                tx.id(),
                tx.status()
            ))));
        }

        tx.started_at = Some(Utc::now());
        tx.transition(TxStatus::Committing);

        let tx_id = tx.id();
        let mut registry = CompensationRegistry::new();
        let mut failure: Option<(String, StepError)> = None;

        for (index, step) in tx.steps.iter_mut().enumerate() {
            tx.current = index;
            let name = step.name().to_string();

            if cancel.is_cancelled() {
                failure = Some((name, StepError::cancelled("cancelled before step started")));
                break;
            }
            let Some(forward) = step.take_forward() else {
                failure = Some((name, StepError::validation("step has already run")));
                break;
            };

            match self.run_forward(forward, cancel).await {
                Ok(success) => {
                    let result = registry.record(&name, success);
                    step.mark_executed(result);
                    tracing::debug!(%tx_id, step = %name, "step succeeded");
                }
                Err(err) => {
                    tracing::warn!(%tx_id, step = %name, error = %err, "step failed");
                    failure = Some((name, err));
                    break;
                }
            }
        }

        let Some((step, cause)) = failure else {
            registry.clear();
            tx.transition(TxStatus::Committed);
            tracing::info!(
                tx_id = %tx.id(),
                name = tx.name(),
                steps = tx.len(),
                "transaction committed"
            );
            return Ok(TransactionReport::from(&*tx));
        };

        tx.transition(TxStatus::Compensating);
        let compensations = registry.compensate_all().await;

        if compensations.iter().any(|c| c.is_failure()) {
            tx.transition(TxStatus::Failed);
            tracing::error!(
                tx_id = %tx.id(),
                name = tx.name(),
                %step,
                error = %cause,
                "transaction failed with partial rollback"
            );
            Err(TransactionError::Failed {
                step,
                cause,
                compensations,
            })
        } else {
            tx.transition(TxStatus::Aborted);
            tracing::info!(
                tx_id = %tx.id(),
                name = tx.name(),
                %step,
                error = %cause,
                compensated = compensations.len(),
                "transaction aborted"
            );
            Err(TransactionError::Aborted { step, cause })
        }
    }

    async fn run_forward(
        &self,
        forward: BoxedForward,
        cancel: &CancellationToken,
    ) -> Result<StepSuccess, StepError> {
        let action = forward();
        let bounded = async {
            match self.config.step_timeout {
                Some(limit) => tokio::time::timeout(limit, action).await.map_err(|_| {
                    StepError::remote(format!("step timed out after {}ms", limit.as_millis()))
                })?,
                None => action.await,
            }
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(StepError::cancelled("cancelled during step")),
            result = bounded => result,
        }
    }
}
