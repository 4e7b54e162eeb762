//! Transaction steps: a named forward action paired with its inverse.
//!
//! Both actions are opaque closures. At registration time the typed pair is
//! erased into a single boxed forward action that, on success, yields the
//! step result together with a compensation already bound to that result.
//! A compensation therefore cannot exist for a forward action that failed.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::StepError;

/// Type-erased step result shared between the step and its compensation record.
pub type StepResult = Arc<dyn Any + Send + Sync>;

/// Boxed compensating action, bound to the result of its forward action.
pub(crate) type BoxedCompensation =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<(), StepError>> + Send>;

/// Boxed forward action.
pub(crate) type BoxedForward =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<StepSuccess, StepError>> + Send>;

/// Output of a successful forward action.
pub(crate) struct StepSuccess {
    pub(crate) result: StepResult,
    pub(crate) compensation: BoxedCompensation,
}

/// One registered step of a [`super::Transaction`].
pub struct Step {
    name: String,
    forward: Option<BoxedForward>,
    executed: bool,
    result: Option<StepResult>,
}

impl Step {
    /// Erases a typed forward/compensate pair into a step.
    pub(crate) fn new<T, F, FFut, C, CFut>(name: String, forward: F, compensate: C) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> FFut + Send + 'static,
        FFut: Future<Output = Result<T, StepError>> + Send + 'static,
        C: FnOnce(T) -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        let forward: BoxedForward = Box::new(move || {
            async move {
                let value = forward().await?;
                let result: StepResult = Arc::new(value.clone());
                let compensation: BoxedCompensation = Box::new(move || compensate(value).boxed());
                Ok(StepSuccess {
                    result,
                    compensation,
                })
            }
            .boxed()
        });
        Self {
            name,
            forward: Some(forward),
            executed: false,
            result: None,
        }
    }

    /// Step name, unique within its transaction by convention.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` iff the forward action returned success.
    #[must_use]
    pub const fn executed(&self) -> bool {
        self.executed
    }

    /// Returns the forward result if the step executed and `T` matches.
    #[must_use]
    pub fn result<T: 'static>(&self) -> Option<&T> {
        self.result.as_ref().and_then(|r| r.downcast_ref::<T>())
    }

    pub(crate) fn take_forward(&mut self) -> Option<BoxedForward> {
        self.forward.take()
    }

    pub(crate) fn mark_executed(&mut self, result: StepResult) {
        self.executed = true;
        self.result = Some(result);
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("executed", &self.executed)
            .field("pending", &self.forward.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_forward_binds_result_to_compensation() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut step = Step::new(
            "create".to_string(),
            || async { Ok::<_, StepError>(41_u32 + 1) },
            move |value| async move {
                if let Ok(mut guard) = sink.lock() {
                    *guard = Some(value);
                }
                Ok::<_, StepError>(())
            },
        );

        let Some(forward) = step.take_forward() else {
            panic!("forward missing");
        };
        let Ok(success) = forward().await else {
            panic!("forward failed");
        };
        step.mark_executed(Arc::clone(&success.result));
        assert!(step.executed());
        assert_eq!(step.result::<u32>(), Some(&42));
        assert_eq!(step.result::<String>(), None);

        assert!((success.compensation)().await.is_ok());
        let value = seen.lock().ok().and_then(|g| *g);
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn failed_forward_yields_no_compensation() {
        let mut step = Step::new(
            "create".to_string(),
            || async { Err::<u32, _>(StepError::remote("503")) },
            |_| async { Ok::<_, StepError>(()) },
        );
        let Some(forward) = step.take_forward() else {
            panic!("forward missing");
        };
        assert!(forward().await.is_err());
        assert!(!step.executed());
        assert!(step.take_forward().is_none());
    }
}
