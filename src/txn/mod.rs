//! Distributed-transaction coordinator with compensations.
//!
//! A [`Transaction`] is an ordered list of steps, each pairing a forward
//! action with the compensating action that undoes it. The
//! [`Coordinator`] runs the forward actions in order; if one fails (or the
//! caller cancels), every forward action that already succeeded is undone
//! in reverse order through the [`CompensationRegistry`].
//!
//! ```text
//! pending -> committing -> committed
//!                       \-> compensating -> aborted   (all undone)
//!                                        \-> failed   (partial rollback)
//! ```
//!
//! The coordinator is in-memory: a crash during compensation leaves the
//! Git gateway and the local store inconsistent.

pub mod compensation;
pub mod coordinator;
pub mod step;
pub mod transaction;

pub use compensation::{CompensationOutcome, CompensationRecord, CompensationRegistry};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use step::{Step, StepResult};
pub use transaction::{Transaction, TransactionId, TransactionReport, TxStatus};
