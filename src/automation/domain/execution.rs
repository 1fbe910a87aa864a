//! Execution ledger rows: one per rule evaluated against an event.

use super::{ExecutionId, OriginRef, ParseOutcomeError, RuleId};
use crate::pool::domain::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a candidate rule was not applied.
///
/// The fixed evaluation order is: `Inactive`, `NotUserTriggered`,
/// `NotMatching`, `Idempotent`; `TemplateError` covers rule-local
/// instantiation failures caught after the checks pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// The workflow or rule was inactive at evaluation time.
    Inactive,
    /// The event did not originate from an authenticated end user.
    NotUserTriggered,
    /// The rule's task-type filter did not match the event.
    NotMatching,
    /// An applied execution already exists for this rule and origin.
    Idempotent,
    /// The rule's template set could not be resolved.
    TemplateError,
}

impl SuppressionReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::NotUserTriggered => "not_user_triggered",
            Self::NotMatching => "not_matching",
            Self::Idempotent => "idempotent",
            Self::TemplateError => "template_error",
        }
    }
}

impl TryFrom<&str> for SuppressionReason {
    type Error = ParseOutcomeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inactive" => Ok(Self::Inactive),
            "not_user_triggered" => Ok(Self::NotUserTriggered),
            "not_matching" => Ok(Self::NotMatching),
            "idempotent" => Ok(Self::Idempotent),
            "template_error" => Ok(Self::TemplateError),
            _ => Err(ParseOutcomeError(value.to_owned())),
        }
    }
}

/// Outcome of evaluating one rule against one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The rule fired and its templates were instantiated.
    Applied,
    /// The rule was evaluated but deliberately not applied.
    Suppressed(SuppressionReason),
}

impl ExecutionOutcome {
    /// Returns `true` for applied outcomes.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Returns the suppression reason, if any.
    #[must_use]
    pub const fn suppression_reason(&self) -> Option<SuppressionReason> {
        match self {
            Self::Applied => None,
            Self::Suppressed(reason) => Some(*reason),
        }
    }

    /// Returns the canonical storage discriminant.
    #[must_use]
    pub const fn outcome_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Suppressed(_) => "suppressed",
        }
    }
}

/// One append-only ledger row. Never updated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecution {
    id: ExecutionId,
    rule_id: RuleId,
    origin: OriginRef,
    outcome: ExecutionOutcome,
    triggered_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl RuleExecution {
    /// Records a fresh evaluation.
    #[must_use]
    pub fn record(
        rule_id: RuleId,
        origin: OriginRef,
        outcome: ExecutionOutcome,
        triggered_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            rule_id,
            origin,
            outcome,
            triggered_by,
            created_at,
        }
    }

    /// Reconstructs a ledger row from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: ExecutionId,
        rule_id: RuleId,
        origin: OriginRef,
        outcome: ExecutionOutcome,
        triggered_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rule_id,
            origin,
            outcome,
            triggered_by,
            created_at,
        }
    }

    /// Returns the ledger row identifier.
    #[must_use]
    pub const fn id(&self) -> ExecutionId {
        self.id
    }

    /// Returns the evaluated rule.
    #[must_use]
    pub const fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    /// Returns the originating entity.
    #[must_use]
    pub const fn origin(&self) -> OriginRef {
        self.origin
    }

    /// Returns the evaluation outcome.
    #[must_use]
    pub const fn outcome(&self) -> ExecutionOutcome {
        self.outcome
    }

    /// Returns the user whose action triggered the originating event.
    #[must_use]
    pub const fn triggered_by(&self) -> Option<UserId> {
        self.triggered_by
    }

    /// Returns when the evaluation was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
