//! State-change events published by the transaction coordinator.

use super::{ResourceType, TriggerState};
use crate::pool::domain::{CardId, MilestoneId, OrgId, ProjectId, TaskId, TaskTypeId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Typed reference to the entity whose state change triggered evaluation.
///
/// Together with a rule identifier this forms the idempotency key: a rule
/// applies at most once per origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin_type", content = "origin_id", rename_all = "snake_case")]
pub enum OriginRef {
    /// A task state change.
    Task(TaskId),
    /// A card derived-state change.
    Card(CardId),
    /// A milestone derived-state change.
    Milestone(MilestoneId),
}

impl OriginRef {
    /// Returns the resource type of the originating entity.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        match self {
            Self::Task(_) => ResourceType::Task,
            Self::Card(_) => ResourceType::Card,
            Self::Milestone(_) => ResourceType::Milestone,
        }
    }

    /// Returns the originating entity's raw identifier.
    #[must_use]
    pub const fn entity_id(&self) -> Uuid {
        match self {
            Self::Task(id) => id.into_inner(),
            Self::Card(id) => id.into_inner(),
            Self::Milestone(id) => id.into_inner(),
        }
    }
}

/// A state change observed inside the mutation transaction.
///
/// Built by the transaction coordinator after a successful task mutation
/// (and for each derived card/milestone state change it caused); never
/// externally addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    origin: OriginRef,
    to: TriggerState,
    org_id: OrgId,
    project_id: ProjectId,
    task_type: Option<TaskTypeId>,
    triggered_by: Option<UserId>,
}

impl StateChangeEvent {
    /// Creates an event with no task-type detail and no triggering user.
    #[must_use]
    pub const fn new(
        origin: OriginRef,
        to: TriggerState,
        org_id: OrgId,
        project_id: ProjectId,
    ) -> Self {
        Self {
            origin,
            to,
            org_id,
            project_id,
            task_type: None,
            triggered_by: None,
        }
    }

    /// Sets the task type of the originating task.
    #[must_use]
    pub const fn with_task_type(mut self, task_type: TaskTypeId) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Sets the authenticated user whose action produced the event.
    #[must_use]
    pub const fn with_triggering_user(mut self, user_id: UserId) -> Self {
        self.triggered_by = Some(user_id);
        self
    }

    /// Returns the originating entity reference.
    #[must_use]
    pub const fn origin(&self) -> OriginRef {
        self.origin
    }

    /// Returns the state the entity transitioned to.
    #[must_use]
    pub const fn to(&self) -> TriggerState {
        self.to
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the originating task's type, when the origin is a task.
    #[must_use]
    pub const fn task_type(&self) -> Option<TaskTypeId> {
        self.task_type
    }

    /// Returns the triggering user, absent for system-originated events.
    #[must_use]
    pub const fn triggered_by(&self) -> Option<UserId> {
        self.triggered_by
    }
}
