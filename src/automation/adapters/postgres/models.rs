//! Diesel row models and conversions for automation persistence.

use super::schema::{rule_executions, rule_templates, rules, task_templates, workflows};
use crate::automation::domain::{
    ExecutionId, ExecutionOutcome, OriginRef, ResourceType, Rule, RuleExecution, RuleId,
    RuleTrigger, SuppressionReason, TaskTemplate, TemplateBinding, TemplateId, TriggerState,
    Workflow, WorkflowId, WorkflowName, WorkflowScope,
};
use crate::pool::adapters::postgres::models::CorruptRow;
use crate::pool::domain::{
    CardId, MilestoneId, OrgId, Priority, ProjectId, TaskId, TaskTitle, TaskTypeId, UserId,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Query result row for workflow records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WorkflowRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Option<Uuid>,
    pub(crate) name: String,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for workflow records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workflows)]
pub(crate) struct NewWorkflowRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Option<Uuid>,
    pub(crate) name: String,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

/// Query result row for rule records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RuleRow {
    pub(crate) id: Uuid,
    pub(crate) workflow_id: Uuid,
    pub(crate) position: i32,
    pub(crate) resource_type: String,
    pub(crate) to_state: String,
    pub(crate) task_type_id: Option<Uuid>,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for rule records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rules)]
pub(crate) struct NewRuleRow {
    pub(crate) id: Uuid,
    pub(crate) workflow_id: Uuid,
    pub(crate) position: i32,
    pub(crate) resource_type: String,
    pub(crate) to_state: String,
    pub(crate) task_type_id: Option<Uuid>,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

/// Query result and insert row for rule-template bindings.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = rule_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RuleTemplateRow {
    pub(crate) rule_id: Uuid,
    pub(crate) template_id: Uuid,
    pub(crate) execution_order: i32,
}

/// Query result row for task-template records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskTemplateRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) name: String,
    pub(crate) type_id: Uuid,
    pub(crate) priority: i16,
    pub(crate) description: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for task-template records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_templates)]
pub(crate) struct NewTaskTemplateRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) name: String,
    pub(crate) type_id: Uuid,
    pub(crate) priority: i16,
    pub(crate) description: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Query result row for ledger records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rule_executions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RuleExecutionRow {
    pub(crate) id: Uuid,
    pub(crate) rule_id: Uuid,
    pub(crate) origin_type: String,
    pub(crate) origin_id: Uuid,
    pub(crate) outcome: String,
    pub(crate) suppression_reason: Option<String>,
    pub(crate) triggered_by: Option<Uuid>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for ledger records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rule_executions)]
pub(crate) struct NewRuleExecutionRow {
    pub(crate) id: Uuid,
    pub(crate) rule_id: Uuid,
    pub(crate) origin_type: String,
    pub(crate) origin_id: Uuid,
    pub(crate) outcome: String,
    pub(crate) suppression_reason: Option<String>,
    pub(crate) triggered_by: Option<Uuid>,
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) fn workflow_to_row(workflow: &Workflow) -> NewWorkflowRow {
    NewWorkflowRow {
        id: workflow.id().into_inner(),
        org_id: workflow.scope().org_id().into_inner(),
        project_id: workflow.scope().project_id().map(ProjectId::into_inner),
        name: workflow.name().as_str().to_owned(),
        active: workflow.active(),
        created_at: workflow.created_at(),
    }
}

pub(crate) fn row_to_workflow(row: WorkflowRow) -> Result<Workflow, CorruptRow> {
    let name = WorkflowName::new(row.name)
        .map_err(|err| CorruptRow::new("workflow", row.id, err.to_string()))?;
    let org_id = OrgId::from_uuid(row.org_id);
    let scope = match row.project_id {
        Some(project_id) => WorkflowScope::project(org_id, ProjectId::from_uuid(project_id)),
        None => WorkflowScope::org_wide(org_id),
    };
    Ok(Workflow::from_persisted(
        WorkflowId::from_uuid(row.id),
        scope,
        name,
        row.active,
        row.created_at,
    ))
}

pub(crate) fn rule_to_row(rule: &Rule) -> NewRuleRow {
    NewRuleRow {
        id: rule.id().into_inner(),
        workflow_id: rule.workflow_id().into_inner(),
        position: rule.position(),
        resource_type: rule.trigger().state().resource_type().as_str().to_owned(),
        to_state: rule.trigger().state().state_str().to_owned(),
        task_type_id: rule.trigger().task_type().map(TaskTypeId::into_inner),
        active: rule.active(),
        created_at: rule.created_at(),
    }
}

pub(crate) fn assemble_rule(
    row: RuleRow,
    bindings: Vec<RuleTemplateRow>,
) -> Result<Rule, CorruptRow> {
    let state = TriggerState::parse(&row.resource_type, &row.to_state)
        .map_err(|err| CorruptRow::new("rule", row.id, err.to_string()))?;
    let mut trigger = RuleTrigger::new(state);
    if let Some(task_type) = row.task_type_id {
        trigger = trigger.with_task_type(TaskTypeId::from_uuid(task_type));
    }
    let templates = bindings
        .into_iter()
        .map(|binding| {
            TemplateBinding::new(
                TemplateId::from_uuid(binding.template_id),
                binding.execution_order,
            )
        })
        .collect();
    Ok(Rule::from_persisted(
        RuleId::from_uuid(row.id),
        WorkflowId::from_uuid(row.workflow_id),
        row.position,
        trigger,
        row.active,
        templates,
        row.created_at,
    ))
}

pub(crate) fn template_to_row(template: &TaskTemplate) -> NewTaskTemplateRow {
    NewTaskTemplateRow {
        id: template.id().into_inner(),
        org_id: template.org_id().into_inner(),
        name: template.name().as_str().to_owned(),
        type_id: template.type_id().into_inner(),
        priority: template.priority().value(),
        description: template.description().map(ToOwned::to_owned),
        created_at: template.created_at(),
    }
}

pub(crate) fn row_to_template(row: TaskTemplateRow) -> Result<TaskTemplate, CorruptRow> {
    let name = TaskTitle::new(row.name)
        .map_err(|err| CorruptRow::new("task_template", row.id, err.to_string()))?;
    let priority = Priority::new(row.priority)
        .map_err(|err| CorruptRow::new("task_template", row.id, err.to_string()))?;
    Ok(TaskTemplate::from_persisted(
        TemplateId::from_uuid(row.id),
        OrgId::from_uuid(row.org_id),
        name,
        TaskTypeId::from_uuid(row.type_id),
        priority,
        row.description,
        row.created_at,
    ))
}

pub(crate) fn execution_to_row(execution: &RuleExecution) -> NewRuleExecutionRow {
    NewRuleExecutionRow {
        id: execution.id().into_inner(),
        rule_id: execution.rule_id().into_inner(),
        origin_type: execution.origin().resource_type().as_str().to_owned(),
        origin_id: execution.origin().entity_id(),
        outcome: execution.outcome().outcome_str().to_owned(),
        suppression_reason: execution
            .outcome()
            .suppression_reason()
            .map(|reason| reason.as_str().to_owned()),
        triggered_by: execution.triggered_by().map(UserId::into_inner),
        created_at: execution.created_at(),
    }
}

pub(crate) fn row_to_execution(row: RuleExecutionRow) -> Result<RuleExecution, CorruptRow> {
    let corrupt = |detail: String| CorruptRow::new("rule_execution", row.id, detail);

    let resource = ResourceType::try_from(row.origin_type.as_str())
        .map_err(|err| corrupt(err.to_string()))?;
    let origin = match resource {
        ResourceType::Task => OriginRef::Task(TaskId::from_uuid(row.origin_id)),
        ResourceType::Card => OriginRef::Card(CardId::from_uuid(row.origin_id)),
        ResourceType::Milestone => OriginRef::Milestone(MilestoneId::from_uuid(row.origin_id)),
    };
    let outcome = match row.outcome.as_str() {
        "applied" => ExecutionOutcome::Applied,
        "suppressed" => {
            let reason = row
                .suppression_reason
                .as_deref()
                .ok_or_else(|| corrupt("suppressed row without reason".to_owned()))
                .and_then(|raw| {
                    SuppressionReason::try_from(raw).map_err(|err| corrupt(err.to_string()))
                })?;
            ExecutionOutcome::Suppressed(reason)
        }
        other => return Err(corrupt(format!("unknown outcome {other}"))),
    };
    Ok(RuleExecution::from_persisted(
        ExecutionId::from_uuid(row.id),
        RuleId::from_uuid(row.rule_id),
        origin,
        outcome,
        row.triggered_by.map(UserId::from_uuid),
        row.created_at,
    ))
}
