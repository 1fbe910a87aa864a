//! Task aggregate root: lifecycle state machine and optimistic versioning.

use super::{
    CardId, InvalidVersionError, OrgId, ParseClaimModeError, ProjectId, TaskId,
    TaskTransitionError, TaskTypeId, TaskValidationError, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optimistic-concurrency version counter.
///
/// Starts at 1 on creation and strictly increases by 1 on every successful
/// mutation. Storage adapters use it for guarded conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Version assigned to freshly created tasks.
    pub const INITIAL: Self = Self(1);

    /// Reconstructs a version from its persisted numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidVersionError`] when the value is not positive.
    pub const fn from_persisted(value: i64) -> Result<Self, InvalidVersionError> {
        if value < 1 {
            return Err(InvalidVersionError(value));
        }
        Ok(Self(value))
    }

    /// Returns the next version in sequence.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority on the 1 (lowest) to 5 (highest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(i16);

impl Priority {
    /// Lowest accepted priority value.
    pub const MIN: i16 = 1;
    /// Highest accepted priority value.
    pub const MAX: i16 = 5;

    /// Creates a validated priority.
    ///
    /// # Errors
    ///
    /// Returns [`TaskValidationError::InvalidPriority`] when the value falls
    /// outside the 1–5 range.
    pub const fn new(value: i16) -> Result<Self, TaskValidationError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(TaskValidationError::InvalidPriority(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i16 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-empty, trimmed title for tasks, cards, and milestones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Creates a validated title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskValidationError::EmptyTitle`] when the value is empty
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskTitle {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work mode within the claimed state.
///
/// `Taken` means the task is reserved; `Ongoing` means a live work session
/// is running. The mode feeds rule triggers such as "task became ongoing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Reserved by the claimant, no active work session.
    Taken,
    /// The claimant is actively working on the task right now.
    Ongoing,
}

impl ClaimMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Taken => "taken",
            Self::Ongoing => "ongoing",
        }
    }
}

impl TryFrom<&str> for ClaimMode {
    type Error = ParseClaimModeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "taken" => Ok(Self::Taken),
            "ongoing" => Ok(Self::Ongoing),
            _ => Err(ParseClaimModeError(value.to_owned())),
        }
    }
}

/// Task lifecycle state.
///
/// The tagged union makes invalid combinations unrepresentable: a completed
/// task cannot carry a claimant and a claimed task cannot carry a
/// completion timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// In the pool, claimable by any project member.
    Available,
    /// Reserved by a claimant.
    Claimed {
        /// The user holding the claim.
        claimed_by: UserId,
        /// When the claim was taken.
        claimed_at: DateTime<Utc>,
        /// Whether a live work session is running.
        mode: ClaimMode,
    },
    /// Finished; terminal.
    Completed {
        /// When the task was completed.
        completed_at: DateTime<Utc>,
    },
}

impl TaskState {
    /// Returns the canonical storage discriminant.
    #[must_use]
    pub const fn status_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Claimed { .. } => "claimed",
            Self::Completed { .. } => "completed",
        }
    }

    /// Returns the current claimant, if any.
    #[must_use]
    pub const fn claimant(&self) -> Option<UserId> {
        match self {
            Self::Claimed { claimed_by, .. } => Some(*claimed_by),
            Self::Available | Self::Completed { .. } => None,
        }
    }

    /// Returns `true` for the terminal completed state.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Inputs for creating a fresh task, with scalar fields already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskData {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Task type from the out-of-scope catalogue.
    pub type_id: TaskTypeId,
    /// Optional card grouping.
    pub card_id: Option<CardId>,
    /// Validated title.
    pub title: TaskTitle,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Validated priority.
    pub priority: Priority,
    /// The user creating the task.
    pub created_by: UserId,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owning organisation.
    pub org_id: OrgId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted task type.
    pub type_id: TaskTypeId,
    /// Persisted card grouping, if any.
    pub card_id: Option<CardId>,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Persisted version counter.
    pub version: Version,
    /// Persisted creator.
    pub created_by: UserId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Task aggregate root.
///
/// All transitions are pure functions over the state union; they perform no
/// I/O. The transaction coordinator owns the read-check-write sequence
/// against storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    org_id: OrgId,
    project_id: ProjectId,
    type_id: TaskTypeId,
    card_id: Option<CardId>,
    title: TaskTitle,
    description: Option<String>,
    priority: Priority,
    state: TaskState,
    version: Version,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a fresh task in the available state with version 1.
    #[must_use]
    pub fn create(data: NewTaskData, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            org_id: data.org_id,
            project_id: data.project_id,
            type_id: data.type_id,
            card_id: data.card_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            state: TaskState::Available,
            version: Version::INITIAL,
            created_by: data.created_by,
            created_at,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            org_id: data.org_id,
            project_id: data.project_id,
            type_id: data.type_id,
            card_id: data.card_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            state: data.state,
            version: data.version,
            created_by: data.created_by,
            created_at: data.created_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
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

    /// Returns the task type.
    #[must_use]
    pub const fn type_id(&self) -> TaskTypeId {
        self.type_id
    }

    /// Returns the card grouping, if any.
    #[must_use]
    pub const fn card_id(&self) -> Option<CardId> {
        self.card_id
    }

    /// Returns the task title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the task priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &TaskState {
        &self.state
    }

    /// Returns the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Claims an available task for the acting user.
    ///
    /// Transitions to `Claimed { mode: Taken }` and bumps the version.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTransitionError::AlreadyClaimed`] when the task is
    /// claimed or [`TaskTransitionError::Terminal`] when it is completed.
    pub fn claim(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<(), TaskTransitionError> {
        match self.state {
            TaskState::Available => {
                self.state = TaskState::Claimed {
                    claimed_by: actor,
                    claimed_at: now,
                    mode: ClaimMode::Taken,
                };
                self.bump();
                Ok(())
            }
            TaskState::Claimed { claimed_by, .. } => {
                Err(TaskTransitionError::AlreadyClaimed { claimed_by })
            }
            TaskState::Completed { .. } => Err(TaskTransitionError::Terminal),
        }
    }

    /// Releases a claimed task back into the pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTransitionError::NotClaimant`] when the actor does not
    /// hold the claim, [`TaskTransitionError::NotClaimed`] for available
    /// tasks, or [`TaskTransitionError::Terminal`] for completed ones.
    pub fn release(&mut self, actor: UserId) -> Result<(), TaskTransitionError> {
        self.require_claimant(actor)?;
        self.state = TaskState::Available;
        self.bump();
        Ok(())
    }

    /// Completes a claimed task. Terminal.
    ///
    /// # Errors
    ///
    /// Same guards as [`Task::release`].
    pub fn complete(
        &mut self,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), TaskTransitionError> {
        self.require_claimant(actor)?;
        self.state = TaskState::Completed { completed_at: now };
        self.bump();
        Ok(())
    }

    /// Starts a live work session on a claimed task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTransitionError::WorkSessionActive`] when a session is
    /// already running, plus the claim guards of [`Task::release`].
    pub fn start_work(&mut self, actor: UserId) -> Result<(), TaskTransitionError> {
        match self.require_claimant(actor)? {
            ClaimMode::Ongoing => Err(TaskTransitionError::WorkSessionActive),
            ClaimMode::Taken => {
                self.set_mode(ClaimMode::Ongoing);
                self.bump();
                Ok(())
            }
        }
    }

    /// Pauses the live work session on a claimed task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTransitionError::WorkSessionIdle`] when no session is
    /// running, plus the claim guards of [`Task::release`].
    pub fn pause_work(&mut self, actor: UserId) -> Result<(), TaskTransitionError> {
        match self.require_claimant(actor)? {
            ClaimMode::Taken => Err(TaskTransitionError::WorkSessionIdle),
            ClaimMode::Ongoing => {
                self.set_mode(ClaimMode::Taken);
                self.bump();
                Ok(())
            }
        }
    }

    /// Returns `true` when the acting user may delete this task: the
    /// creator always may, the current claimant may while holding the claim.
    #[must_use]
    pub fn deletable_by(&self, actor: UserId) -> bool {
        self.created_by == actor || self.state.claimant() == Some(actor)
    }

    fn require_claimant(&self, actor: UserId) -> Result<ClaimMode, TaskTransitionError> {
        match self.state {
            TaskState::Claimed {
                claimed_by, mode, ..
            } => {
                if claimed_by == actor {
                    Ok(mode)
                } else {
                    Err(TaskTransitionError::NotClaimant { claimed_by })
                }
            }
            TaskState::Available => Err(TaskTransitionError::NotClaimed),
            TaskState::Completed { .. } => Err(TaskTransitionError::Terminal),
        }
    }

    fn set_mode(&mut self, new_mode: ClaimMode) {
        if let TaskState::Claimed { ref mut mode, .. } = self.state {
            *mode = new_mode;
        }
    }

    fn bump(&mut self) {
        self.version = self.version.next();
    }
}
