//! `PostgreSQL` workflow definition repository.

use super::models::{
    RuleRow, RuleTemplateRow, TaskTemplateRow, WorkflowRow, assemble_rule, row_to_template,
    row_to_workflow, rule_to_row, template_to_row, workflow_to_row,
};
use super::schema::{rule_templates, rules, task_templates, workflows};
use crate::automation::domain::{
    Rule, RuleId, TaskTemplate, TemplateBinding, TemplateId, Workflow, WorkflowId,
};
use crate::automation::ports::repository::{
    DeleteMode, WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult,
};
use crate::pool::adapters::postgres::PgPool;
use crate::pool::domain::OrgId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

// Required by Diesel's transaction plumbing: commit and rollback failures
// surface through the same error type as the transaction body.
impl From<DieselError> for WorkflowRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed [`WorkflowRepository`].
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkflowRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkflowRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkflowRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkflowRepositoryError::persistence)?
    }
}

fn load_rule_with_bindings(
    connection: &mut PgConnection,
    row: RuleRow,
) -> WorkflowRepositoryResult<Rule> {
    let bindings: Vec<RuleTemplateRow> = rule_templates::table
        .filter(rule_templates::rule_id.eq(row.id))
        .order(rule_templates::execution_order.asc())
        .select(RuleTemplateRow::as_select())
        .load(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    assemble_rule(row, bindings).map_err(WorkflowRepositoryError::persistence)
}

fn workflow_rule_count(
    connection: &mut PgConnection,
    workflow_id: Uuid,
) -> WorkflowRepositoryResult<u64> {
    let count: i64 = rules::table
        .filter(rules::workflow_id.eq(workflow_id))
        .count()
        .get_result(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    u64::try_from(count).map_err(WorkflowRepositoryError::persistence)
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn insert_workflow(&self, workflow: &Workflow) -> WorkflowRepositoryResult<()> {
        let workflow_id = workflow.id();
        let row = workflow_to_row(workflow);
        self.run_blocking(move |connection| {
            diesel::insert_into(workflows::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkflowRepositoryError::DuplicateWorkflow(workflow_id)
                    }
                    other => WorkflowRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_workflow(&self, id: WorkflowId) -> WorkflowRepositoryResult<Option<Workflow>> {
        self.run_blocking(move |connection| {
            let row = workflows::table
                .filter(workflows::id.eq(id.into_inner()))
                .select(WorkflowRow::as_select())
                .first::<WorkflowRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            row.map(|found| row_to_workflow(found).map_err(WorkflowRepositoryError::persistence))
                .transpose()
        })
        .await
    }

    async fn list_workflows(&self, org_id: OrgId) -> WorkflowRepositoryResult<Vec<Workflow>> {
        self.run_blocking(move |connection| {
            let rows: Vec<WorkflowRow> = workflows::table
                .filter(workflows::org_id.eq(org_id.into_inner()))
                .order(workflows::created_at.asc())
                .select(WorkflowRow::as_select())
                .load(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            rows.into_iter()
                .map(|row| row_to_workflow(row).map_err(WorkflowRepositoryError::persistence))
                .collect()
        })
        .await
    }

    async fn update_workflow_active(
        &self,
        id: WorkflowId,
        active: bool,
    ) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let rows = diesel::update(workflows::table.filter(workflows::id.eq(id.into_inner())))
                .set(workflows::active.eq(active))
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if rows == 0 {
                return Err(WorkflowRepositoryError::WorkflowNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_workflow(
        &self,
        id: WorkflowId,
        mode: DeleteMode,
    ) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<(), WorkflowRepositoryError, _>(|tx| {
                let exists: i64 = workflows::table
                    .filter(workflows::id.eq(id.into_inner()))
                    .count()
                    .get_result(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                if exists == 0 {
                    return Err(WorkflowRepositoryError::WorkflowNotFound(id));
                }
                let rule_count = workflow_rule_count(tx, id.into_inner())?;
                if rule_count > 0 && matches!(mode, DeleteMode::Restrict) {
                    return Err(WorkflowRepositoryError::WorkflowHasRules { id, rule_count });
                }

                let rule_ids: Vec<Uuid> = rules::table
                    .filter(rules::workflow_id.eq(id.into_inner()))
                    .select(rules::id)
                    .load(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                diesel::delete(
                    rule_templates::table.filter(rule_templates::rule_id.eq_any(&rule_ids)),
                )
                .execute(tx)
                .map_err(WorkflowRepositoryError::persistence)?;
                diesel::delete(rules::table.filter(rules::workflow_id.eq(id.into_inner())))
                    .execute(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                diesel::delete(workflows::table.filter(workflows::id.eq(id.into_inner())))
                    .execute(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                Ok(())
            })
        })
        .await
    }

    async fn insert_rule(&self, rule: &Rule) -> WorkflowRepositoryResult<()> {
        let workflow_id = rule.workflow_id();
        let rule_id = rule.id();
        let row = rule_to_row(rule);
        self.run_blocking(move |connection| {
            let workflow_exists: i64 = workflows::table
                .filter(workflows::id.eq(workflow_id.into_inner()))
                .count()
                .get_result(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if workflow_exists == 0 {
                return Err(WorkflowRepositoryError::WorkflowNotFound(workflow_id));
            }
            diesel::insert_into(rules::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkflowRepositoryError::DuplicateRule(rule_id)
                    }
                    other => WorkflowRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_rule(&self, id: RuleId) -> WorkflowRepositoryResult<Option<Rule>> {
        self.run_blocking(move |connection| {
            let row = rules::table
                .filter(rules::id.eq(id.into_inner()))
                .select(RuleRow::as_select())
                .first::<RuleRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            row.map(|found| load_rule_with_bindings(connection, found))
                .transpose()
        })
        .await
    }

    async fn list_rules(&self, workflow_id: WorkflowId) -> WorkflowRepositoryResult<Vec<Rule>> {
        self.run_blocking(move |connection| {
            let rows: Vec<RuleRow> = rules::table
                .filter(rules::workflow_id.eq(workflow_id.into_inner()))
                .order(rules::position.asc())
                .select(RuleRow::as_select())
                .load(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            rows.into_iter()
                .map(|row| load_rule_with_bindings(connection, row))
                .collect()
        })
        .await
    }

    async fn next_rule_position(
        &self,
        workflow_id: WorkflowId,
    ) -> WorkflowRepositoryResult<i32> {
        self.run_blocking(move |connection| {
            let max: Option<i32> = rules::table
                .filter(rules::workflow_id.eq(workflow_id.into_inner()))
                .select(diesel::dsl::max(rules::position))
                .get_result(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            Ok(max.map_or(0, |position| position + 1))
        })
        .await
    }

    async fn update_rule_active(&self, id: RuleId, active: bool) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let rows = diesel::update(rules::table.filter(rules::id.eq(id.into_inner())))
                .set(rules::active.eq(active))
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if rows == 0 {
                return Err(WorkflowRepositoryError::RuleNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_rule(&self, id: RuleId, mode: DeleteMode) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<(), WorkflowRepositoryError, _>(|tx| {
                let exists: i64 = rules::table
                    .filter(rules::id.eq(id.into_inner()))
                    .count()
                    .get_result(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                if exists == 0 {
                    return Err(WorkflowRepositoryError::RuleNotFound(id));
                }
                let binding_count: i64 = rule_templates::table
                    .filter(rule_templates::rule_id.eq(id.into_inner()))
                    .count()
                    .get_result(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                let template_count =
                    u64::try_from(binding_count).map_err(WorkflowRepositoryError::persistence)?;
                if template_count > 0 && matches!(mode, DeleteMode::Restrict) {
                    return Err(WorkflowRepositoryError::RuleHasTemplates { id, template_count });
                }
                diesel::delete(
                    rule_templates::table.filter(rule_templates::rule_id.eq(id.into_inner())),
                )
                .execute(tx)
                .map_err(WorkflowRepositoryError::persistence)?;
                diesel::delete(rules::table.filter(rules::id.eq(id.into_inner())))
                    .execute(tx)
                    .map_err(WorkflowRepositoryError::persistence)?;
                Ok(())
            })
        })
        .await
    }

    async fn insert_template(&self, template: &TaskTemplate) -> WorkflowRepositoryResult<()> {
        let template_id = template.id();
        let row = template_to_row(template);
        self.run_blocking(move |connection| {
            diesel::insert_into(task_templates::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkflowRepositoryError::DuplicateTemplate(template_id)
                    }
                    other => WorkflowRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_template(
        &self,
        id: TemplateId,
    ) -> WorkflowRepositoryResult<Option<TaskTemplate>> {
        self.run_blocking(move |connection| {
            let row = task_templates::table
                .filter(task_templates::id.eq(id.into_inner()))
                .select(TaskTemplateRow::as_select())
                .first::<TaskTemplateRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            row.map(|found| row_to_template(found).map_err(WorkflowRepositoryError::persistence))
                .transpose()
        })
        .await
    }

    async fn attach_template(
        &self,
        rule_id: RuleId,
        binding: TemplateBinding,
    ) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let rule_exists: i64 = rules::table
                .filter(rules::id.eq(rule_id.into_inner()))
                .count()
                .get_result(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if rule_exists == 0 {
                return Err(WorkflowRepositoryError::RuleNotFound(rule_id));
            }
            let template_exists: i64 = task_templates::table
                .filter(task_templates::id.eq(binding.template_id().into_inner()))
                .count()
                .get_result(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if template_exists == 0 {
                return Err(WorkflowRepositoryError::TemplateNotFound(
                    binding.template_id(),
                ));
            }
            let row = RuleTemplateRow {
                rule_id: rule_id.into_inner(),
                template_id: binding.template_id().into_inner(),
                execution_order: binding.execution_order(),
            };
            diesel::insert_into(rule_templates::table)
                .values(&row)
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }
}
