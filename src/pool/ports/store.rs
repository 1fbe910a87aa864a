//! Transactional store contract for task mutations and rule evaluation.
//!
//! The coordinator runs a closure against a [`MutationTransaction`]; every
//! write the closure performs commits or rolls back as one unit. The
//! transaction also exposes the evaluation surface the rule engine needs,
//! so spawned tasks and ledger rows share the mutation's atomicity.

use crate::automation::ports::EvaluationStore;
use crate::pool::domain::{Card, MilestoneId, MilestoneProgress, Task, TaskCounts, TaskId, Version};
use crate::pool::domain::CardId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transactional store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by transactional store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Persistence-layer failure. Aborts the enclosing transaction.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result of a guarded, version-conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The row matched the expected version and was written.
    Updated,
    /// The row exists but its version moved on; first write won.
    VersionConflict {
        /// The version currently persisted.
        actual: Version,
    },
    /// The row no longer exists.
    Missing,
}

/// Write surface available inside one storage transaction.
///
/// Extends the rule engine's [`EvaluationStore`] so a single transaction
/// covers the task mutation, spawned tasks, and ledger rows. No component
/// outside the coordinator may write task or ledger rows directly.
pub trait MutationTransaction: EvaluationStore {
    /// Loads a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn load_task(&mut self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Inserts a freshly created task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn insert_task(&mut self, task: &Task) -> StoreResult<()>;

    /// Persists a mutated task only if the stored version still equals
    /// `expected`. The conditional write is what closes the race between
    /// the in-transaction version check and the commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn update_task_guarded(&mut self, task: &Task, expected: Version) -> StoreResult<UpdateOutcome>;

    /// Deletes a task only if the stored version still equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn delete_task_guarded(&mut self, id: TaskId, expected: Version) -> StoreResult<UpdateOutcome>;

    /// Loads a card by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn load_card(&mut self, id: CardId) -> StoreResult<Option<Card>>;

    /// Returns live child-task counts for a card.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn card_task_counts(&mut self, id: CardId) -> StoreResult<TaskCounts>;

    /// Returns the progress rollup for a milestone's cards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn milestone_progress(&mut self, id: MilestoneId) -> StoreResult<MilestoneProgress>;
}

/// Transactional execution contract.
///
/// Adapters begin a storage transaction, hand the work closure a
/// [`MutationTransaction`], and commit only when the closure returns `Ok`.
/// An `Err` from the closure (or any commit failure) rolls everything
/// back.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Runs `work` inside one storage transaction.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error after rollback; commit and
    /// connection failures surface as `E` via `From<StoreError>`.
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn MutationTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}
