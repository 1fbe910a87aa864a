//! Read port over the append-only execution ledger.
//!
//! Ledger rows are written exclusively through the mutation transaction
//! (see [`EvaluationStore::append_execution`]); this port only aggregates
//! and lists what the engine recorded.
//!
//! [`EvaluationStore::append_execution`]: crate::automation::ports::evaluation::EvaluationStore::append_execution

use crate::automation::domain::{DateRange, Page, RuleExecution, RuleId, RuleTally, WorkflowId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger read operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Query surface over recorded rule evaluations.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Lists a rule's evaluations inside the range, newest first.
    async fn executions_for_rule(
        &self,
        rule_id: RuleId,
        range: DateRange,
        page: Page,
    ) -> LedgerResult<Vec<RuleExecution>>;

    /// Tallies a rule's evaluations inside the range.
    async fn rule_tally(&self, rule_id: RuleId, range: DateRange) -> LedgerResult<RuleTally>;

    /// Tallies each of a workflow's rules inside the range, in rule
    /// position order.
    async fn workflow_tally(
        &self,
        workflow_id: WorkflowId,
        range: DateRange,
    ) -> LedgerResult<Vec<(RuleId, RuleTally)>>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
