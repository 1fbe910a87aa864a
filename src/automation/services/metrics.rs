//! Rule metrics read service over the execution ledger.

use crate::automation::domain::{
    DateRange, DateRangeError, Page, RuleExecution, RuleId, RuleTally, WorkflowId,
};
use crate::automation::ports::ledger::{ExecutionLedger, LedgerError};
use crate::automation::ports::repository::{WorkflowRepository, WorkflowRepositoryError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Optional caller-supplied window bounds.
///
/// Missing bounds default to the trailing
/// [`MetricsWindow::DEFAULT_WINDOW_DAYS`] days; the resolved range is then
/// validated against the ledger's 90-day cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsWindow {
    /// Inclusive start, defaulting to 30 days before the end.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive end, defaulting to now.
    pub to: Option<DateTime<Utc>>,
}

impl MetricsWindow {
    /// Window width used when the caller omits `from`.
    pub const DEFAULT_WINDOW_DAYS: i64 = 30;

    /// Resolves the bounds against the clock and validates the range.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError`] for inverted or over-wide ranges.
    pub fn resolve(self, now: DateTime<Utc>) -> Result<DateRange, DateRangeError> {
        let to = self.to.unwrap_or(now);
        match self.from {
            Some(from) => DateRange::new(from, to),
            None => Ok(DateRange::trailing(to, Self::DEFAULT_WINDOW_DAYS)),
        }
    }
}

/// Metrics for one rule over a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetrics {
    /// The rule the tally covers.
    pub rule_id: RuleId,
    /// The resolved, validated window.
    pub range: DateRange,
    /// Evaluation counts and suppression breakdown.
    pub tally: RuleTally,
}

/// Per-rule entry inside a workflow metrics report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRuleMetrics {
    /// The rule the tally covers.
    pub rule_id: RuleId,
    /// Evaluation counts and suppression breakdown.
    pub tally: RuleTally,
}

/// Metrics for a workflow: per-rule tallies plus merged totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowMetrics {
    /// The workflow the report covers.
    pub workflow_id: WorkflowId,
    /// The resolved, validated window.
    pub range: DateRange,
    /// One entry per rule, in rule position order.
    pub rules: Vec<WorkflowRuleMetrics>,
    /// All rule tallies merged.
    pub totals: RuleTally,
}

/// Service-level errors for metrics reads.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The rule does not exist.
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),

    /// The workflow does not exist.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// The requested window is invalid.
    #[error("validation failed for range: {0}")]
    Validation(#[from] DateRangeError),

    /// Ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Definition lookup failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),
}

/// Result type for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Read-only metrics service consumed by the excluded HTTP layer.
#[derive(Clone)]
pub struct RuleMetricsService<R, L, C>
where
    R: WorkflowRepository,
    L: ExecutionLedger,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    ledger: Arc<L>,
    clock: Arc<C>,
}

impl<R, L, C> RuleMetricsService<R, L, C>
where
    R: WorkflowRepository,
    L: ExecutionLedger,
    C: Clock + Send + Sync,
{
    /// Creates a new metrics service.
    #[must_use]
    pub const fn new(repository: Arc<R>, ledger: Arc<L>, clock: Arc<C>) -> Self {
        Self {
            repository,
            ledger,
            clock,
        }
    }

    /// Returns evaluation metrics for one rule.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::RuleNotFound`] for unknown rules and
    /// [`MetricsError::Validation`] for invalid windows.
    pub async fn rule_metrics(
        &self,
        rule_id: RuleId,
        window: MetricsWindow,
    ) -> MetricsResult<RuleMetrics> {
        self.require_rule(rule_id).await?;
        let range = window.resolve(self.clock.utc())?;
        let tally = self.ledger.rule_tally(rule_id, range).await?;
        Ok(RuleMetrics {
            rule_id,
            range,
            tally,
        })
    }

    /// Returns evaluation metrics for every rule of a workflow, plus
    /// merged totals.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::WorkflowNotFound`] for unknown workflows
    /// and [`MetricsError::Validation`] for invalid windows.
    pub async fn workflow_metrics(
        &self,
        workflow_id: WorkflowId,
        window: MetricsWindow,
    ) -> MetricsResult<WorkflowMetrics> {
        if self.repository.find_workflow(workflow_id).await?.is_none() {
            return Err(MetricsError::WorkflowNotFound(workflow_id));
        }
        let range = window.resolve(self.clock.utc())?;
        let per_rule = self.ledger.workflow_tally(workflow_id, range).await?;

        let mut totals = RuleTally::default();
        let mut rules = Vec::with_capacity(per_rule.len());
        for (rule_id, tally) in per_rule {
            totals.merge(&tally);
            rules.push(WorkflowRuleMetrics { rule_id, tally });
        }
        Ok(WorkflowMetrics {
            workflow_id,
            range,
            rules,
            totals,
        })
    }

    /// Lists a rule's ledger rows inside a window, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::RuleNotFound`] for unknown rules and
    /// [`MetricsError::Validation`] for invalid windows.
    pub async fn executions(
        &self,
        rule_id: RuleId,
        window: MetricsWindow,
        page: Page,
    ) -> MetricsResult<Vec<RuleExecution>> {
        self.require_rule(rule_id).await?;
        let range = window.resolve(self.clock.utc())?;
        Ok(self.ledger.executions_for_rule(rule_id, range, page).await?)
    }

    async fn require_rule(&self, rule_id: RuleId) -> MetricsResult<()> {
        if self.repository.find_rule(rule_id).await?.is_none() {
            return Err(MetricsError::RuleNotFound(rule_id));
        }
        Ok(())
    }
}
