//! Card aggregate ("ficha") and its derived state.
//!
//! A card never stores state. Its state is always recomputed from live
//! child-task counts so it can never drift from the tasks themselves.

use super::{
    CardId, MilestoneId, OrgId, ParseCardStateError, ProjectId, TaskTitle, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live child-task counts for a card, queried at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    /// Total number of child tasks.
    pub total: u64,
    /// Number of completed child tasks.
    pub completed: u64,
    /// Number of available (unclaimed) child tasks.
    pub available: u64,
}

impl TaskCounts {
    /// Creates a counts snapshot.
    #[must_use]
    pub const fn new(total: u64, completed: u64, available: u64) -> Self {
        Self {
            total,
            completed,
            available,
        }
    }
}

/// Derived card state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// No work has started: the card is empty or all tasks sit in the pool.
    Pendiente,
    /// At least one task has been taken out of the pool.
    EnCurso,
    /// Every child task is complete.
    Cerrada,
}

impl CardState {
    /// Derives the card state from live child-task counts.
    ///
    /// Total over all valid inputs: an empty card is `Pendiente`, a card
    /// whose tasks are all completed is `Cerrada`, a card with any task
    /// taken out of the pool is `EnCurso`, otherwise `Pendiente`.
    #[must_use]
    pub const fn derive(counts: TaskCounts) -> Self {
        if counts.total == 0 {
            return Self::Pendiente;
        }
        if counts.completed == counts.total {
            return Self::Cerrada;
        }
        if counts.available < counts.total {
            return Self::EnCurso;
        }
        Self::Pendiente
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::EnCurso => "en_curso",
            Self::Cerrada => "cerrada",
        }
    }
}

impl TryFrom<&str> for CardState {
    type Error = ParseCardStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pendiente" => Ok(Self::Pendiente),
            "en_curso" => Ok(Self::EnCurso),
            "cerrada" => Ok(Self::Cerrada),
            _ => Err(ParseCardStateError(value.to_owned())),
        }
    }
}

/// Parameter object for reconstructing a persisted card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCardData {
    /// Persisted card identifier.
    pub id: CardId,
    /// Persisted owning organisation.
    pub org_id: OrgId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted milestone grouping, if any.
    pub milestone_id: Option<MilestoneId>,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted creator.
    pub created_by: UserId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Card aggregate: a grouping of tasks whose state is always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    org_id: OrgId,
    project_id: ProjectId,
    milestone_id: Option<MilestoneId>,
    title: TaskTitle,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Card {
    /// Creates a fresh card.
    #[must_use]
    pub fn create(
        org_id: OrgId,
        project_id: ProjectId,
        milestone_id: Option<MilestoneId>,
        title: TaskTitle,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CardId::new(),
            org_id,
            project_id,
            milestone_id,
            title,
            created_by,
            created_at,
        }
    }

    /// Reconstructs a card from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedCardData) -> Self {
        Self {
            id: data.id,
            org_id: data.org_id,
            project_id: data.project_id,
            milestone_id: data.milestone_id,
            title: data.title,
            created_by: data.created_by,
            created_at: data.created_at,
        }
    }

    /// Returns the card identifier.
    #[must_use]
    pub const fn id(&self) -> CardId {
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

    /// Returns the milestone grouping, if any.
    #[must_use]
    pub const fn milestone_id(&self) -> Option<MilestoneId> {
        self.milestone_id
    }

    /// Returns the card title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
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
}
