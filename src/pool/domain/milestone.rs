//! Milestone aggregate and its derived progress, one level above cards.

use super::{MilestoneId, OrgId, ParseMilestoneStateError, ProjectId, TaskCounts, TaskTitle, UserId};
use super::card::CardState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress rollup folded from the per-card task counts of a milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    /// Number of cards under the milestone.
    pub cards_total: u64,
    /// Number of cards whose derived state is closed.
    pub cards_completed: u64,
    /// Total number of tasks across those cards.
    pub tasks_total: u64,
    /// Number of completed tasks across those cards.
    pub tasks_completed: u64,
    /// Number of available tasks across those cards.
    pub tasks_available: u64,
}

impl MilestoneProgress {
    /// Folds per-card task counts into a milestone rollup.
    ///
    /// Shared by every adapter so the milestone read path cannot diverge
    /// from the card derivation rules.
    #[must_use]
    pub fn from_card_counts(counts: impl IntoIterator<Item = TaskCounts>) -> Self {
        let mut progress = Self::default();
        for card in counts {
            progress.cards_total += 1;
            if matches!(CardState::derive(card), CardState::Cerrada) {
                progress.cards_completed += 1;
            }
            progress.tasks_total += card.total;
            progress.tasks_completed += card.completed;
            progress.tasks_available += card.available;
        }
        progress
    }

    /// Returns `true` when the milestone is complete: at least one unit of
    /// work exists and every card and every task is complete.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        (self.cards_total > 0 || self.tasks_total > 0)
            && self.cards_completed == self.cards_total
            && self.tasks_completed == self.tasks_total
    }
}

/// Derived milestone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneState {
    /// No work has started under the milestone.
    Ready,
    /// Some task has been taken out of the pool.
    Active,
    /// Every card and task under the milestone is complete.
    Completed,
}

impl MilestoneState {
    /// Derives the milestone state from its progress rollup.
    ///
    /// Mirrors the card derivation one level up: completed when the rollup
    /// says so, active once any task left the pool, ready otherwise.
    #[must_use]
    pub const fn derive(progress: &MilestoneProgress) -> Self {
        if progress.is_completed() {
            return Self::Completed;
        }
        if progress.tasks_available < progress.tasks_total {
            return Self::Active;
        }
        Self::Ready
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for MilestoneState {
    type Error = ParseMilestoneStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ready" => Ok(Self::Ready),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseMilestoneStateError(value.to_owned())),
        }
    }
}

/// Milestone aggregate: a grouping of cards whose state is always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    id: MilestoneId,
    org_id: OrgId,
    project_id: ProjectId,
    title: TaskTitle,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Milestone {
    /// Creates a fresh milestone.
    #[must_use]
    pub fn create(
        org_id: OrgId,
        project_id: ProjectId,
        title: TaskTitle,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MilestoneId::new(),
            org_id,
            project_id,
            title,
            created_by,
            created_at,
        }
    }

    /// Reconstructs a milestone from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: MilestoneId,
        org_id: OrgId,
        project_id: ProjectId,
        title: TaskTitle,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            org_id,
            project_id,
            title,
            created_by,
            created_at,
        }
    }

    /// Returns the milestone identifier.
    #[must_use]
    pub const fn id(&self) -> MilestoneId {
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

    /// Returns the milestone title.
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
