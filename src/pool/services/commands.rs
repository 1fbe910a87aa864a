//! Task mutation coordinator.
//!
//! Wraps the task state transition, derived-state cascade, rule
//! evaluation, and ledger writes in one storage transaction: a rule side
//! effect is never visible without its triggering mutation, and vice
//! versa. Version checks follow first-write-wins; the loser gets the
//! persisted version back so the client can refresh and retry.

use crate::automation::domain::{OriginRef, StateChangeEvent, TaskTrigger, TriggerState};
use crate::automation::services::RuleEngine;
use crate::pool::domain::{
    Actor, Card, CardId, CardState, MilestoneId, MilestoneState, NewTaskData, Priority, Task,
    TaskId, TaskTitle, TaskTransitionError, TaskTypeId, TaskValidationError, Version,
};
use crate::pool::domain::{OrgId, ProjectId};
use crate::pool::ports::store::{MutationTransaction, StoreError, TaskStore, UpdateOutcome};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// The three state-machine mutations plus the work-session toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOperation {
    /// Take an available task out of the pool.
    Claim,
    /// Return a claimed task to the pool.
    Release,
    /// Finish a claimed task. Terminal.
    Complete,
    /// Start a live work session on a claimed task.
    StartWork,
    /// Pause the live work session on a claimed task.
    PauseWork,
}

impl TaskOperation {
    /// Returns a stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Release => "release",
            Self::Complete => "complete",
            Self::StartWork => "start_work",
            Self::PauseWork => "pause_work",
        }
    }
}

/// Inbound mutation command, as produced by the excluded HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutateTask {
    /// The task to mutate.
    pub task_id: TaskId,
    /// The authenticated acting user.
    pub actor: Actor,
    /// The version the caller last observed.
    pub expected_version: Version,
    /// The mutation to apply.
    pub operation: TaskOperation,
}

/// Inbound task-creation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTask {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Task type from the out-of-scope catalogue.
    pub type_id: TaskTypeId,
    /// Optional card grouping; must reference a card in the same project.
    pub card_id: Option<CardId>,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Priority on the 1–5 scale.
    pub priority: i16,
    /// The authenticated acting user.
    pub actor: Actor,
}

/// Inbound task-deletion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteTask {
    /// The task to delete.
    pub task_id: TaskId,
    /// The authenticated acting user.
    pub actor: Actor,
    /// The version the caller last observed.
    pub expected_version: Version,
}

/// Service-level errors for task commands.
#[derive(Debug, Error)]
pub enum TaskCommandError {
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Optimistic-concurrency mismatch; re-fetch and retry.
    #[error("version conflict: expected {expected}, actual {actual}")]
    ConflictVersion {
        /// The version the caller expected.
        expected: Version,
        /// The version currently persisted.
        actual: Version,
    },

    /// The task is already claimed.
    #[error("task is already claimed")]
    ConflictClaimed,

    /// The acting user may not perform this operation.
    #[error("operation forbidden for the acting user")]
    Forbidden,

    /// The state machine rejected the transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(TaskTransitionError),

    /// Malformed input.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The rejected field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Storage failure; the whole transaction rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TaskTransitionError> for TaskCommandError {
    fn from(err: TaskTransitionError) -> Self {
        match err {
            TaskTransitionError::AlreadyClaimed { .. } => Self::ConflictClaimed,
            TaskTransitionError::NotClaimant { .. } => Self::Forbidden,
            other => Self::InvalidTransition(other),
        }
    }
}

impl From<TaskValidationError> for TaskCommandError {
    fn from(err: TaskValidationError) -> Self {
        let field = match err {
            TaskValidationError::EmptyTitle => "title",
            TaskValidationError::InvalidPriority(_) => "priority",
        };
        Self::Validation {
            field,
            reason: err.to_string(),
        }
    }
}

/// Result type for task command operations.
pub type TaskCommandResult<T> = Result<T, TaskCommandError>;

/// Task mutation coordinator service.
#[derive(Clone)]
pub struct TaskCommandService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    engine: RuleEngine,
    clock: Arc<C>,
}

impl<S, C> TaskCommandService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a new coordinator.
    #[must_use]
    pub const fn new(store: Arc<S>, engine: RuleEngine, clock: Arc<C>) -> Self {
        Self {
            store,
            engine,
            clock,
        }
    }

    /// Creates a task in the available state at version 1.
    ///
    /// Creation is not a state-machine edge, so no task event is
    /// published; the parent card and milestone derived-state changes it
    /// causes are, within the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TaskCommandError::Validation`] for bad input and
    /// [`TaskCommandError::Store`] when the transaction fails.
    pub async fn create(&self, request: CreateTask) -> TaskCommandResult<Task> {
        let title = TaskTitle::new(request.title)?;
        let priority = Priority::new(request.priority)?;
        let data = NewTaskData {
            org_id: request.org_id,
            project_id: request.project_id,
            type_id: request.type_id,
            card_id: request.card_id,
            title,
            description: request.description,
            priority,
            created_by: request.actor.user_id(),
        };
        let now = self.clock.utc();
        let engine = self.engine;
        let actor = request.actor;

        let task = self
            .store
            .with_transaction(move |tx| -> TaskCommandResult<Task> {
                if let Some(card_id) = data.card_id {
                    require_card_in_project(tx, card_id, data.project_id)?;
                }
                let before = AggregateSnapshot::capture(tx, data.card_id)?;
                let task = Task::create(data, now);
                tx.insert_task(&task)?;

                let events = before.changed_events(tx, &task, actor)?;
                for event in &events {
                    engine.evaluate(tx, event, now)?;
                }
                Ok(task)
            })
            .await?;
        tracing::info!(task_id = %task.id(), "task created");
        Ok(task)
    }

    /// Applies one state-machine mutation under optimistic concurrency and
    /// evaluates rules for every state change it produced.
    ///
    /// # Errors
    ///
    /// Returns [`TaskCommandError::ConflictVersion`] when the expected
    /// version is stale, [`TaskCommandError::ConflictClaimed`] /
    /// [`TaskCommandError::Forbidden`] / transition errors per the state
    /// machine, and [`TaskCommandError::Store`] when the transaction
    /// fails.
    pub async fn mutate(&self, command: MutateTask) -> TaskCommandResult<Task> {
        let now = self.clock.utc();
        let engine = self.engine;

        let result = self
            .store
            .with_transaction(move |tx| {
                let mut task = tx
                    .load_task(command.task_id)?
                    .ok_or(TaskCommandError::NotFound(command.task_id))?;
                if task.version() != command.expected_version {
                    return Err(TaskCommandError::ConflictVersion {
                        expected: command.expected_version,
                        actual: task.version(),
                    });
                }

                let before = AggregateSnapshot::capture(tx, task.card_id())?;
                apply_operation(&mut task, command.operation, command.actor, now)?;

                match tx.update_task_guarded(&task, command.expected_version)? {
                    UpdateOutcome::Updated => {}
                    UpdateOutcome::VersionConflict { actual } => {
                        return Err(TaskCommandError::ConflictVersion {
                            expected: command.expected_version,
                            actual,
                        });
                    }
                    UpdateOutcome::Missing => {
                        return Err(TaskCommandError::NotFound(command.task_id));
                    }
                }

                let mut events = vec![task_event(&task, command.actor)];
                events.extend(before.changed_events(tx, &task, command.actor)?);
                for event in &events {
                    engine.evaluate(tx, event, now)?;
                }
                Ok(task)
            })
            .await;

        match &result {
            Ok(task) => tracing::info!(
                task_id = %task.id(),
                operation = command.operation.as_str(),
                version = %task.version(),
                "task mutation applied",
            ),
            Err(TaskCommandError::ConflictVersion { expected, actual }) => tracing::warn!(
                task_id = %command.task_id,
                %expected,
                %actual,
                "task mutation lost the version race",
            ),
            Err(_) => {}
        }
        result
    }

    /// Deletes a task under optimistic concurrency. Only the creator or
    /// the current claimant may delete.
    ///
    /// # Errors
    ///
    /// Returns [`TaskCommandError::Forbidden`] for other actors,
    /// [`TaskCommandError::ConflictVersion`] on stale versions, and
    /// [`TaskCommandError::Store`] when the transaction fails.
    pub async fn delete(&self, command: DeleteTask) -> TaskCommandResult<()> {
        let now = self.clock.utc();
        let engine = self.engine;

        self.store
            .with_transaction(move |tx| {
                let task = tx
                    .load_task(command.task_id)?
                    .ok_or(TaskCommandError::NotFound(command.task_id))?;
                if task.version() != command.expected_version {
                    return Err(TaskCommandError::ConflictVersion {
                        expected: command.expected_version,
                        actual: task.version(),
                    });
                }
                if !task.deletable_by(command.actor.user_id()) {
                    return Err(TaskCommandError::Forbidden);
                }

                let before = AggregateSnapshot::capture(tx, task.card_id())?;
                match tx.delete_task_guarded(command.task_id, command.expected_version)? {
                    UpdateOutcome::Updated => {}
                    UpdateOutcome::VersionConflict { actual } => {
                        return Err(TaskCommandError::ConflictVersion {
                            expected: command.expected_version,
                            actual,
                        });
                    }
                    UpdateOutcome::Missing => {
                        return Err(TaskCommandError::NotFound(command.task_id));
                    }
                }

                let events = before.changed_events(tx, &task, command.actor)?;
                for event in &events {
                    engine.evaluate(tx, event, now)?;
                }
                Ok(())
            })
            .await
    }
}

fn apply_operation(
    task: &mut Task,
    operation: TaskOperation,
    actor: Actor,
    now: DateTime<Utc>,
) -> TaskCommandResult<()> {
    let user = actor.user_id();
    let applied = match operation {
        TaskOperation::Claim => task.claim(user, now),
        TaskOperation::Release => task.release(user),
        TaskOperation::Complete => task.complete(user, now),
        TaskOperation::StartWork => task.start_work(user),
        TaskOperation::PauseWork => task.pause_work(user),
    };
    applied.map_err(TaskCommandError::from)
}

fn task_event(task: &Task, actor: Actor) -> StateChangeEvent {
    StateChangeEvent::new(
        OriginRef::Task(task.id()),
        TriggerState::Task(TaskTrigger::from_task_state(task.state())),
        task.org_id(),
        task.project_id(),
    )
    .with_task_type(task.type_id())
    .with_triggering_user(actor.user_id())
}

fn require_card_in_project(
    tx: &mut dyn MutationTransaction,
    card_id: CardId,
    project_id: ProjectId,
) -> TaskCommandResult<Card> {
    let card = tx
        .load_card(card_id)?
        .ok_or_else(|| TaskCommandError::Validation {
            field: "card_id",
            reason: format!("unknown card {card_id}"),
        })?;
    if card.project_id() != project_id {
        return Err(TaskCommandError::Validation {
            field: "card_id",
            reason: "card belongs to a different project".to_owned(),
        });
    }
    Ok(card)
}

/// Derived card/milestone state captured before a task write, so the
/// coordinator can publish events for the changes the write caused.
struct AggregateSnapshot {
    card: Option<CardSnapshot>,
}

struct CardSnapshot {
    card_id: CardId,
    milestone_id: Option<MilestoneId>,
    card_state: CardState,
    milestone_state: Option<MilestoneState>,
}

impl AggregateSnapshot {
    fn capture(
        tx: &mut dyn MutationTransaction,
        card_id: Option<CardId>,
    ) -> TaskCommandResult<Self> {
        let Some(card_id) = card_id else {
            return Ok(Self { card: None });
        };
        let Some(card) = tx.load_card(card_id)? else {
            // Dangling grouping; nothing to cascade on.
            return Ok(Self { card: None });
        };
        let card_state = CardState::derive(tx.card_task_counts(card_id)?);
        let milestone_state = match card.milestone_id() {
            Some(milestone_id) => {
                let progress = tx.milestone_progress(milestone_id)?;
                Some(MilestoneState::derive(&progress))
            }
            None => None,
        };
        Ok(Self {
            card: Some(CardSnapshot {
                card_id,
                milestone_id: card.milestone_id(),
                card_state,
                milestone_state,
            }),
        })
    }

    /// Recomputes the derived states and returns one event per state that
    /// actually changed, card before milestone.
    fn changed_events(
        &self,
        tx: &mut dyn MutationTransaction,
        task: &Task,
        actor: Actor,
    ) -> TaskCommandResult<Vec<StateChangeEvent>> {
        let Some(before) = &self.card else {
            return Ok(Vec::new());
        };
        let mut events = Vec::new();

        let card_state = CardState::derive(tx.card_task_counts(before.card_id)?);
        if card_state != before.card_state {
            events.push(
                StateChangeEvent::new(
                    OriginRef::Card(before.card_id),
                    TriggerState::Card(card_state),
                    task.org_id(),
                    task.project_id(),
                )
                .with_triggering_user(actor.user_id()),
            );
        }

        if let Some(milestone_id) = before.milestone_id {
            let progress = tx.milestone_progress(milestone_id)?;
            let milestone_state = MilestoneState::derive(&progress);
            if Some(milestone_state) != before.milestone_state {
                events.push(
                    StateChangeEvent::new(
                        OriginRef::Milestone(milestone_id),
                        TriggerState::Milestone(milestone_state),
                        task.org_id(),
                        task.project_id(),
                    )
                    .with_triggering_user(actor.user_id()),
                );
            }
        }
        Ok(events)
    }
}
