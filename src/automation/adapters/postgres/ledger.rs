//! `PostgreSQL` execution ledger reads.

use super::models::{RuleExecutionRow, row_to_execution};
use super::schema::{rule_executions, rules};
use crate::automation::domain::{DateRange, Page, RuleExecution, RuleId, RuleTally, WorkflowId};
use crate::automation::ports::ledger::{ExecutionLedger, LedgerError, LedgerResult};
use crate::pool::adapters::postgres::PgPool;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

/// `PostgreSQL`-backed [`ExecutionLedger`].
///
/// Read-only: the ledger table is written exclusively through the mutation
/// transaction.
#[derive(Debug, Clone)]
pub struct PostgresExecutionLedger {
    pool: PgPool,
}

impl PostgresExecutionLedger {
    /// Creates a ledger view from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut PgConnection) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(LedgerError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(LedgerError::persistence)?
    }
}

fn tally_rule(
    connection: &mut PgConnection,
    rule_id: Uuid,
    range: DateRange,
) -> LedgerResult<RuleTally> {
    let rows: Vec<RuleExecutionRow> = rule_executions::table
        .filter(rule_executions::rule_id.eq(rule_id))
        .filter(rule_executions::created_at.ge(range.from()))
        .filter(rule_executions::created_at.le(range.to()))
        .select(RuleExecutionRow::as_select())
        .load(connection)
        .map_err(LedgerError::persistence)?;
    let mut tally = RuleTally::default();
    for row in rows {
        let execution = row_to_execution(row).map_err(LedgerError::persistence)?;
        tally.record(execution.outcome());
    }
    Ok(tally)
}

#[async_trait]
impl ExecutionLedger for PostgresExecutionLedger {
    async fn executions_for_rule(
        &self,
        rule_id: RuleId,
        range: DateRange,
        page: Page,
    ) -> LedgerResult<Vec<RuleExecution>> {
        self.run_blocking(move |connection| {
            let offset = i64::try_from(page.offset()).map_err(LedgerError::persistence)?;
            let limit = i64::try_from(page.limit()).map_err(LedgerError::persistence)?;
            let rows: Vec<RuleExecutionRow> = rule_executions::table
                .filter(rule_executions::rule_id.eq(rule_id.into_inner()))
                .filter(rule_executions::created_at.ge(range.from()))
                .filter(rule_executions::created_at.le(range.to()))
                .order(rule_executions::created_at.desc())
                .offset(offset)
                .limit(limit)
                .select(RuleExecutionRow::as_select())
                .load(connection)
                .map_err(LedgerError::persistence)?;
            rows.into_iter()
                .map(|row| row_to_execution(row).map_err(LedgerError::persistence))
                .collect()
        })
        .await
    }

    async fn rule_tally(&self, rule_id: RuleId, range: DateRange) -> LedgerResult<RuleTally> {
        self.run_blocking(move |connection| tally_rule(connection, rule_id.into_inner(), range))
            .await
    }

    async fn workflow_tally(
        &self,
        workflow_id: WorkflowId,
        range: DateRange,
    ) -> LedgerResult<Vec<(RuleId, RuleTally)>> {
        self.run_blocking(move |connection| {
            let rule_ids: Vec<Uuid> = rules::table
                .filter(rules::workflow_id.eq(workflow_id.into_inner()))
                .order(rules::position.asc())
                .select(rules::id)
                .load(connection)
                .map_err(LedgerError::persistence)?;
            rule_ids
                .into_iter()
                .map(|rule_id| {
                    tally_rule(connection, rule_id, range)
                        .map(|tally| (RuleId::from_uuid(rule_id), tally))
                })
                .collect()
        })
        .await
    }
}
