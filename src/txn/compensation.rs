//! Compensation registry.
//!
//! Holds one [`CompensationRecord`] per successful forward action of an
//! in-flight transaction and replays them in LIFO order on abort.

use std::fmt;

use serde::Serialize;

use super::step::{BoxedCompensation, StepResult, StepSuccess};
use crate::error::StepError;

/// Reversal recorded after a forward action succeeded.
pub struct CompensationRecord {
    step: String,
    original: StepResult,
    action: BoxedCompensation,
}

impl CompensationRecord {
    /// Name of the step this record reverses.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// The forward result the compensation was bound to.
    #[must_use]
    pub fn original<T: 'static>(&self) -> Option<&T> {
        self.original.downcast_ref::<T>()
    }
}

impl fmt::Debug for CompensationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationRecord")
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

/// Result of running one compensating action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationOutcome {
    /// Step that was compensated.
    pub step: String,
    /// Error, if the compensation failed. `NotFound` never appears here.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_error")]
    pub error: Option<StepError>,
}

impl CompensationOutcome {
    /// A successful compensation.
    #[must_use]
    pub fn succeeded(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            error: None,
        }
    }

    /// A failed compensation.
    #[must_use]
    pub fn failed(step: impl Into<String>, error: StepError) -> Self {
        Self {
            step: step.into(),
            error: Some(error),
        }
    }

    /// Returns `true` if the compensation failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<StepError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Ordered log of compensations for one transaction.
#[derive(Debug, Default)]
pub struct CompensationRegistry {
    records: Vec<CompensationRecord>,
}

impl CompensationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, step: &str, success: StepSuccess) -> StepResult {
        let original = std::sync::Arc::clone(&success.result);
        self.records.push(CompensationRecord {
            step: step.to_string(),
            original: success.result,
            action: success.compensation,
        });
        original
    }

    /// Number of queued compensations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Queued records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[CompensationRecord] {
        &self.records
    }

    /// Discards every record; used once a transaction commits.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Runs every queued compensation, newest first.
    ///
    /// A failing compensation does not stop the remaining ones. A
    /// `NotFound` failure counts as success: the target is already gone.
    pub async fn compensate_all(&mut self) -> Vec<CompensationOutcome> {
        let mut outcomes = Vec::with_capacity(self.records.len());
        while let Some(record) = self.records.pop() {
            let outcome = match (record.action)().await {
                Ok(()) => CompensationOutcome::succeeded(record.step),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(step = %record.step, error = %e, "compensation target already absent");
                    CompensationOutcome::succeeded(record.step)
                }
                Err(e) => {
                    tracing::warn!(step = %record.step, error = %e, "compensation failed");
                    CompensationOutcome::failed(record.step, e)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_util::FutureExt;

    use super::*;

    fn success(log: &Arc<Mutex<Vec<String>>>, name: &str, outcome: Result<(), StepError>) -> StepSuccess {
        let log = Arc::clone(log);
        let name = name.to_string();
        StepSuccess {
            result: Arc::new(name.clone()),
            compensation: Box::new(move || {
                async move {
                    if let Ok(mut guard) = log.lock() {
                        guard.push(name);
                    }
                    outcome
                }
                .boxed()
            }),
        }
    }

    #[tokio::test]
    async fn compensations_run_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CompensationRegistry::new();
        for name in ["a", "b", "c"] {
            let _ = registry.record(name, success(&log, name, Ok(())));
        }
        assert_eq!(registry.len(), 3);

        let outcomes = registry.compensate_all().await;
        assert!(registry.is_empty());
        assert!(outcomes.iter().all(|o| !o.is_failure()));
        let order = log.lock().map(|g| g.clone()).unwrap_or_default();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn failure_does_not_stop_remaining_compensations() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CompensationRegistry::new();
        let _ = registry.record("a", success(&log, "a", Ok(())));
        let _ = registry.record("b", success(&log, "b", Err(StepError::remote("503"))));
        let _ = registry.record("c", success(&log, "c", Ok(())));

        let outcomes = registry.compensate_all().await;
        assert_eq!(outcomes.len(), 3);
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.step.as_str())
            .collect();
        assert_eq!(failed, vec!["b"]);
        assert_eq!(log.lock().map(|g| g.len()).unwrap_or_default(), 3);
    }

    #[tokio::test]
    async fn not_found_counts_as_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CompensationRegistry::new();
        let _ = registry.record("gone", success(&log, "gone", Err(StepError::not_found("repo"))));
        let outcomes = registry.compensate_all().await;
        assert_eq!(outcomes, vec![CompensationOutcome::succeeded("gone")]);
    }

    #[test]
    fn record_exposes_original_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CompensationRegistry::new();
        let _ = registry.record("x", success(&log, "x", Ok(())));
        let Some(record) = registry.records().first() else {
            panic!("record missing");
        };
        assert_eq!(record.step(), "x");
        assert_eq!(record.original::<String>().map(String::as_str), Some("x"));
    }
}
