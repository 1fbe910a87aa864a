//! Repository port for board reads and card/milestone persistence.

use crate::pool::domain::{
    Card, CardId, Milestone, MilestoneId, Task, TaskCounts, TaskId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for board repository operations.
pub type BoardRepositoryResult<T> = Result<T, BoardRepositoryError>;

/// Read-and-admin persistence contract for tasks, cards, and milestones.
///
/// Card and milestone state is never stored; the counts surfaces exist so
/// services recompute derived state from live task rows on every read.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Stores a new card.
    ///
    /// # Errors
    ///
    /// Returns [`BoardRepositoryError::DuplicateCard`] when the identifier
    /// already exists.
    async fn insert_card(&self, card: &Card) -> BoardRepositoryResult<()>;

    /// Stores a new milestone.
    ///
    /// # Errors
    ///
    /// Returns [`BoardRepositoryError::DuplicateMilestone`] when the
    /// identifier already exists.
    async fn insert_milestone(&self, milestone: &Milestone) -> BoardRepositoryResult<()>;

    /// Finds a task by identifier. Returns `None` when absent.
    async fn find_task(&self, id: TaskId) -> BoardRepositoryResult<Option<Task>>;

    /// Finds a card by identifier. Returns `None` when absent.
    async fn find_card(&self, id: CardId) -> BoardRepositoryResult<Option<Card>>;

    /// Finds a milestone by identifier. Returns `None` when absent.
    async fn find_milestone(&self, id: MilestoneId) -> BoardRepositoryResult<Option<Milestone>>;

    /// Returns all tasks grouped under the given card.
    async fn list_tasks_by_card(&self, id: CardId) -> BoardRepositoryResult<Vec<Task>>;

    /// Returns live child-task counts for a card.
    async fn card_task_counts(&self, id: CardId) -> BoardRepositoryResult<TaskCounts>;

    /// Returns the per-card task counts for every card under a milestone.
    async fn milestone_card_counts(&self, id: MilestoneId)
    -> BoardRepositoryResult<Vec<TaskCounts>>;
}

/// Errors returned by board repository implementations.
#[derive(Debug, Clone, Error)]
pub enum BoardRepositoryError {
    /// A card with the same identifier already exists.
    #[error("duplicate card identifier: {0}")]
    DuplicateCard(CardId),

    /// A milestone with the same identifier already exists.
    #[error("duplicate milestone identifier: {0}")]
    DuplicateMilestone(MilestoneId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BoardRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
