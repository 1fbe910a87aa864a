//! In-memory execution ledger reads.

use crate::automation::domain::{DateRange, Page, RuleExecution, RuleId, RuleTally, WorkflowId};
use crate::automation::ports::ledger::{ExecutionLedger, LedgerError, LedgerResult};
use crate::pool::adapters::memory::InMemoryStore;
use async_trait::async_trait;

/// In-memory [`ExecutionLedger`] backed by the shared pool store.
///
/// Read-only: rows reach the ledger exclusively through the mutation
/// transaction.
#[derive(Debug, Clone)]
pub struct InMemoryExecutionLedger {
    store: InMemoryStore,
}

impl InMemoryExecutionLedger {
    /// Creates a ledger view over the shared store.
    #[must_use]
    pub const fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ExecutionLedger for InMemoryExecutionLedger {
    async fn executions_for_rule(
        &self,
        rule_id: RuleId,
        range: DateRange,
        page: Page,
    ) -> LedgerResult<Vec<RuleExecution>> {
        let state = self.store.lock().map_err(LedgerError::persistence)?;
        let mut rows: Vec<RuleExecution> = state
            .executions
            .iter()
            .filter(|execution| {
                execution.rule_id() == rule_id && range.contains(execution.created_at())
            })
            .copied()
            .collect();
        rows.sort_by_key(|execution| std::cmp::Reverse(execution.created_at()));
        Ok(rows
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect())
    }

    async fn rule_tally(&self, rule_id: RuleId, range: DateRange) -> LedgerResult<RuleTally> {
        let state = self.store.lock().map_err(LedgerError::persistence)?;
        let mut tally = RuleTally::default();
        for execution in &state.executions {
            if execution.rule_id() == rule_id && range.contains(execution.created_at()) {
                tally.record(execution.outcome());
            }
        }
        Ok(tally)
    }

    async fn workflow_tally(
        &self,
        workflow_id: WorkflowId,
        range: DateRange,
    ) -> LedgerResult<Vec<(RuleId, RuleTally)>> {
        let state = self.store.lock().map_err(LedgerError::persistence)?;
        let mut rules: Vec<_> = state
            .rules
            .values()
            .filter(|rule| rule.workflow_id() == workflow_id)
            .collect();
        rules.sort_by_key(|rule| rule.position());

        let tallies = rules
            .into_iter()
            .map(|rule| {
                let mut tally = RuleTally::default();
                for execution in &state.executions {
                    if execution.rule_id() == rule.id() && range.contains(execution.created_at()) {
                        tally.record(execution.outcome());
                    }
                }
                (rule.id(), tally)
            })
            .collect();
        Ok(tallies)
    }
}
