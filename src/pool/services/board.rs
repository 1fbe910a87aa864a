//! Board administration and read service for cards and milestones.
//!
//! Card and milestone state is never stored; every view recomputes it
//! from live task counts at read time.

use crate::pool::domain::{
    Actor, Card, CardId, CardState, Milestone, MilestoneId, MilestoneProgress, MilestoneState,
    OrgId, ProjectId, Task, TaskCounts, TaskTitle, TaskValidationError,
};
use crate::pool::ports::repository::{BoardRepository, BoardRepositoryError};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for creating a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCard {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Optional milestone grouping.
    pub milestone_id: Option<MilestoneId>,
    /// Card title.
    pub title: String,
    /// The authenticated acting user; must hold the admin role.
    pub actor: Actor,
}

/// Request payload for creating a milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMilestone {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Milestone title.
    pub title: String,
    /// The authenticated acting user; must hold the admin role.
    pub actor: Actor,
}

/// A card joined with its live counts and derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// The card itself.
    pub card: Card,
    /// Live child-task counts.
    pub counts: TaskCounts,
    /// State derived from the counts at read time.
    pub state: CardState,
}

/// A milestone joined with its live progress and derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneView {
    /// The milestone itself.
    pub milestone: Milestone,
    /// Progress folded from per-card task counts.
    pub progress: MilestoneProgress,
    /// State derived from the progress at read time.
    pub state: MilestoneState,
}

/// Service-level errors for board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The acting user lacks the admin role.
    #[error("operation requires the project admin role")]
    Forbidden,

    /// The card does not exist.
    #[error("card not found: {0}")]
    CardNotFound(CardId),

    /// The milestone does not exist.
    #[error("milestone not found: {0}")]
    MilestoneNotFound(MilestoneId),

    /// Malformed input.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The rejected field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] BoardRepositoryError),
}

impl From<TaskValidationError> for BoardError {
    fn from(err: TaskValidationError) -> Self {
        Self::Validation {
            field: "title",
            reason: err.to_string(),
        }
    }
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Card and milestone administration plus derived-state reads.
#[derive(Clone)]
pub struct BoardService<R, C>
where
    R: BoardRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> BoardService<R, C>
where
    R: BoardRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new board service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a card. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Forbidden`] for non-admin actors,
    /// [`BoardError::MilestoneNotFound`] for a dangling milestone
    /// reference, and validation errors for an empty title.
    pub async fn create_card(&self, request: CreateCard) -> BoardResult<Card> {
        if !request.actor.is_admin() {
            return Err(BoardError::Forbidden);
        }
        let title = TaskTitle::new(request.title)?;
        if let Some(milestone_id) = request.milestone_id
            && self.repository.find_milestone(milestone_id).await?.is_none()
        {
            return Err(BoardError::MilestoneNotFound(milestone_id));
        }
        let card = Card::create(
            request.org_id,
            request.project_id,
            request.milestone_id,
            title,
            request.actor.user_id(),
            self.clock.utc(),
        );
        self.repository.insert_card(&card).await?;
        Ok(card)
    }

    /// Creates a milestone. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Forbidden`] for non-admin actors and
    /// validation errors for an empty title.
    pub async fn create_milestone(&self, request: CreateMilestone) -> BoardResult<Milestone> {
        if !request.actor.is_admin() {
            return Err(BoardError::Forbidden);
        }
        let title = TaskTitle::new(request.title)?;
        let milestone = Milestone::create(
            request.org_id,
            request.project_id,
            title,
            request.actor.user_id(),
            self.clock.utc(),
        );
        self.repository.insert_milestone(&milestone).await?;
        Ok(milestone)
    }

    /// Returns a card with its live counts and derived state.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CardNotFound`] when absent.
    pub async fn card_view(&self, id: CardId) -> BoardResult<CardView> {
        let card = self
            .repository
            .find_card(id)
            .await?
            .ok_or(BoardError::CardNotFound(id))?;
        let counts = self.repository.card_task_counts(id).await?;
        Ok(CardView {
            card,
            counts,
            state: CardState::derive(counts),
        })
    }

    /// Returns a milestone with its live progress and derived state.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::MilestoneNotFound`] when absent.
    pub async fn milestone_view(&self, id: MilestoneId) -> BoardResult<MilestoneView> {
        let milestone = self
            .repository
            .find_milestone(id)
            .await?
            .ok_or(BoardError::MilestoneNotFound(id))?;
        let per_card = self.repository.milestone_card_counts(id).await?;
        let progress = MilestoneProgress::from_card_counts(per_card);
        Ok(MilestoneView {
            milestone,
            progress,
            state: MilestoneState::derive(&progress),
        })
    }

    /// Returns the tasks grouped under a card.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CardNotFound`] when the card is absent.
    pub async fn card_tasks(&self, id: CardId) -> BoardResult<Vec<Task>> {
        if self.repository.find_card(id).await?.is_none() {
            return Err(BoardError::CardNotFound(id));
        }
        Ok(self.repository.list_tasks_by_card(id).await?)
    }
}
