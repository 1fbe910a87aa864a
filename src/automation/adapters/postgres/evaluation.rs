//! Evaluation-store surface of the `PostgreSQL` mutation transaction.
//!
//! Implemented on the pool's open transaction so rule reads, spawned
//! tasks, and ledger appends share the originating mutation's atomicity.

use super::models::{
    RuleRow, RuleTemplateRow, TaskTemplateRow, assemble_rule, execution_to_row, row_to_template,
};
use super::schema::{rule_executions, rule_templates, rules, workflows};
use crate::automation::domain::{
    OriginRef, RuleExecution, RuleId, StateChangeEvent, TaskTemplate, TemplateId, WorkflowScope,
};
use crate::automation::ports::evaluation::{CandidateRule, EvaluationStore};
use crate::pool::adapters::postgres::PgTransaction;
use crate::pool::adapters::postgres::models::task_to_row;
use crate::pool::adapters::postgres::schema::tasks;
use crate::pool::domain::{ProjectId, Task};
use crate::pool::ports::store::{StoreError, StoreResult};
use diesel::prelude::*;
use uuid::Uuid;

impl EvaluationStore for PgTransaction<'_> {
    fn candidate_rules(&mut self, event: &StateChangeEvent) -> StoreResult<Vec<CandidateRule>> {
        let covering: Vec<(Uuid, Option<Uuid>, bool)> = workflows::table
            .filter(workflows::org_id.eq(event.org_id().into_inner()))
            .filter(
                workflows::project_id
                    .is_null()
                    .or(workflows::project_id.eq(event.project_id().into_inner())),
            )
            .order(workflows::created_at.asc())
            .select((workflows::id, workflows::project_id, workflows::active))
            .load(self.conn)
            .map_err(StoreError::persistence)?;
        if covering.is_empty() {
            return Ok(Vec::new());
        }

        let workflow_ids: Vec<Uuid> = covering.iter().map(|(id, _, _)| *id).collect();
        let rule_rows: Vec<RuleRow> = rules::table
            .filter(rules::workflow_id.eq_any(&workflow_ids))
            .filter(rules::resource_type.eq(event.to().resource_type().as_str()))
            .filter(rules::to_state.eq(event.to().state_str()))
            .order(rules::position.asc())
            .select(RuleRow::as_select())
            .load(self.conn)
            .map_err(StoreError::persistence)?;
        if rule_rows.is_empty() {
            return Ok(Vec::new());
        }

        let rule_ids: Vec<Uuid> = rule_rows.iter().map(|row| row.id).collect();
        let bindings: Vec<RuleTemplateRow> = rule_templates::table
            .filter(rule_templates::rule_id.eq_any(&rule_ids))
            .select(RuleTemplateRow::as_select())
            .load(self.conn)
            .map_err(StoreError::persistence)?;

        // Assemble in workflow order, rules already position-ordered.
        let mut candidates = Vec::with_capacity(rule_rows.len());
        for (workflow_id, project_id, active) in covering {
            let scope = match project_id {
                Some(project) => {
                    WorkflowScope::project(event.org_id(), ProjectId::from_uuid(project))
                }
                None => WorkflowScope::org_wide(event.org_id()),
            };
            for row in rule_rows
                .iter()
                .filter(|row| row.workflow_id == workflow_id)
            {
                let rule_bindings: Vec<RuleTemplateRow> = bindings
                    .iter()
                    .filter(|binding| binding.rule_id == row.id)
                    .cloned()
                    .collect();
                let rule = assemble_rule(row.clone(), rule_bindings)
                    .map_err(StoreError::persistence)?;
                candidates.push(CandidateRule::new(rule, scope, active));
            }
        }
        Ok(candidates)
    }

    fn load_template(&mut self, id: TemplateId) -> StoreResult<Option<TaskTemplate>> {
        let row = super::schema::task_templates::table
            .filter(super::schema::task_templates::id.eq(id.into_inner()))
            .select(TaskTemplateRow::as_select())
            .first::<TaskTemplateRow>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(|found| row_to_template(found).map_err(StoreError::persistence))
            .transpose()
    }

    fn has_applied_execution(&mut self, rule_id: RuleId, origin: OriginRef) -> StoreResult<bool> {
        let count: i64 = rule_executions::table
            .filter(rule_executions::rule_id.eq(rule_id.into_inner()))
            .filter(rule_executions::origin_type.eq(origin.resource_type().as_str()))
            .filter(rule_executions::origin_id.eq(origin.entity_id()))
            .filter(rule_executions::outcome.eq("applied"))
            .count()
            .get_result(self.conn)
            .map_err(StoreError::persistence)?;
        Ok(count > 0)
    }

    fn insert_spawned_task(&mut self, task: &Task) -> StoreResult<()> {
        diesel::insert_into(tasks::table)
            .values(task_to_row(task))
            .execute(self.conn)
            .map_err(StoreError::persistence)?;
        Ok(())
    }

    fn append_execution(&mut self, execution: &RuleExecution) -> StoreResult<()> {
        diesel::insert_into(rule_executions::table)
            .values(execution_to_row(execution))
            .execute(self.conn)
            .map_err(StoreError::persistence)?;
        Ok(())
    }
}
