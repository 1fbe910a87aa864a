//! Typed rule triggers: resource type plus target state.
//!
//! The surrounding system transports triggers as string pairs. They are
//! parsed into these closed sums once, at the store boundary, so the
//! evaluation engine pattern-matches exhaustively.

use super::{ParseResourceTypeError, TriggerParseError};
use crate::pool::domain::{CardState, ClaimMode, MilestoneState, TaskState};
use serde::{Deserialize, Serialize};

/// Kind of entity whose state change can trigger rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A task in the pool.
    Task,
    /// A card aggregate.
    Card,
    /// A milestone aggregate.
    Milestone,
}

impl ResourceType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Card => "card",
            Self::Milestone => "milestone",
        }
    }
}

impl TryFrom<&str> for ResourceType {
    type Error = ParseResourceTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "card" => Ok(Self::Card),
            "milestone" => Ok(Self::Milestone),
            _ => Err(ParseResourceTypeError(value.to_owned())),
        }
    }
}

/// Observable task states a rule can trigger on.
///
/// Distinct from [`TaskState`]: the trigger flattens the claim mode into
/// two observable states so rules can fire on "task became ongoing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTrigger {
    /// The task entered (or re-entered) the pool.
    Available,
    /// The task was claimed without a running work session.
    Taken,
    /// A live work session started on the task.
    Ongoing,
    /// The task was completed.
    Completed,
}

impl TaskTrigger {
    /// Returns the observable trigger state for a task lifecycle state.
    #[must_use]
    pub const fn from_task_state(state: &TaskState) -> Self {
        match state {
            TaskState::Available => Self::Available,
            TaskState::Claimed {
                mode: ClaimMode::Taken,
                ..
            } => Self::Taken,
            TaskState::Claimed {
                mode: ClaimMode::Ongoing,
                ..
            } => Self::Ongoing,
            TaskState::Completed { .. } => Self::Completed,
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Taken => "taken",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}

/// Target state of a rule trigger, scoped per resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "resource_type", content = "to_state", rename_all = "snake_case")]
pub enum TriggerState {
    /// A task reaching an observable state.
    Task(TaskTrigger),
    /// A card's derived state changing.
    Card(CardState),
    /// A milestone's derived state changing.
    Milestone(MilestoneState),
}

impl TriggerState {
    /// Parses the string-typed boundary representation into a typed trigger.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerParseError`] when the resource type is unknown or
    /// the state does not exist for that resource type.
    pub fn parse(resource_type: &str, to_state: &str) -> Result<Self, TriggerParseError> {
        let resource = ResourceType::try_from(resource_type)?;
        let unknown_state = || TriggerParseError::UnknownState {
            resource_type: resource,
            state: to_state.to_owned(),
        };
        match resource {
            ResourceType::Task => parse_task_trigger(to_state).ok_or_else(unknown_state).map(Self::Task),
            ResourceType::Card => CardState::try_from(to_state)
                .map(Self::Card)
                .map_err(|_| unknown_state()),
            ResourceType::Milestone => MilestoneState::try_from(to_state)
                .map(Self::Milestone)
                .map_err(|_| unknown_state()),
        }
    }

    /// Returns the resource type this trigger applies to.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        match self {
            Self::Task(_) => ResourceType::Task,
            Self::Card(_) => ResourceType::Card,
            Self::Milestone(_) => ResourceType::Milestone,
        }
    }

    /// Returns the canonical storage representation of the target state.
    #[must_use]
    pub const fn state_str(&self) -> &'static str {
        match self {
            Self::Task(trigger) => trigger.as_str(),
            Self::Card(state) => state.as_str(),
            Self::Milestone(state) => state.as_str(),
        }
    }
}

fn parse_task_trigger(value: &str) -> Option<TaskTrigger> {
    match value.trim().to_ascii_lowercase().as_str() {
        "available" => Some(TaskTrigger::Available),
        "taken" => Some(TaskTrigger::Taken),
        "ongoing" => Some(TaskTrigger::Ongoing),
        "completed" => Some(TaskTrigger::Completed),
        _ => None,
    }
}
