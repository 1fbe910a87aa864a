//! Workflow administration service: definition CRUD, activation cascade,
//! and guarded deletes.

use crate::automation::domain::{
    Rule, RuleId, RuleTrigger, TaskTemplate, TemplateBinding, TemplateId, TriggerParseError,
    TriggerState, Workflow, WorkflowDomainError, WorkflowId, WorkflowName, WorkflowScope,
};
use crate::automation::ports::repository::{
    DeleteMode, WorkflowRepository, WorkflowRepositoryError,
};
use crate::pool::domain::{OrgId, Priority, ProjectId, TaskTitle, TaskTypeId, TaskValidationError};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Which sibling workflows an exclusive activation deactivates.
///
/// The upstream business rule left the sibling scope open; it is therefore
/// an explicit parameter here. [`CascadeScope::Project`] is the documented
/// default: activating a workflow deactivates the other workflows covering
/// the same project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadeScope {
    /// Activate without touching siblings.
    None,
    /// Deactivate sibling workflows covering the same project scope.
    #[default]
    Project,
    /// Deactivate every other workflow in the organisation.
    Organization,
}

/// Request payload for creating a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWorkflow {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Optional project narrowing; `None` means org-wide.
    pub project_id: Option<ProjectId>,
    /// Workflow name, validated non-empty.
    pub name: String,
}

/// Request payload for adding a rule to a workflow.
///
/// Carries the boundary's string-typed trigger pair; parsing happens here,
/// once, so everything downstream holds a typed trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRule {
    /// Owning workflow.
    pub workflow_id: WorkflowId,
    /// Trigger resource type: `task`, `card`, or `milestone`.
    pub resource_type: String,
    /// Trigger target state, scoped to the resource type.
    pub to_state: String,
    /// Optional task-type narrowing.
    pub task_type_id: Option<TaskTypeId>,
}

/// Request payload for creating a task template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTemplate {
    /// Owning organisation.
    pub org_id: OrgId,
    /// Template name, used as the spawned task's title.
    pub name: String,
    /// Task type stamped onto spawned tasks.
    pub type_id: TaskTypeId,
    /// Priority (1–5) stamped onto spawned tasks.
    pub priority: i16,
    /// Optional description copied onto spawned tasks.
    pub description: Option<String>,
}

/// Service-level errors for workflow administration.
#[derive(Debug, Error)]
pub enum WorkflowAdminError {
    /// Malformed input.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The rejected field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),
}

impl From<WorkflowDomainError> for WorkflowAdminError {
    fn from(err: WorkflowDomainError) -> Self {
        Self::Validation {
            field: "name",
            reason: err.to_string(),
        }
    }
}

impl From<TriggerParseError> for WorkflowAdminError {
    fn from(err: TriggerParseError) -> Self {
        Self::Validation {
            field: "trigger",
            reason: err.to_string(),
        }
    }
}

/// Result type for workflow administration operations.
pub type WorkflowAdminResult<T> = Result<T, WorkflowAdminError>;

/// Workflow definition administration.
#[derive(Clone)]
pub struct WorkflowAdminService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> WorkflowAdminService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new administration service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates and stores a workflow, active by default.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowAdminError`] when the name is invalid or
    /// persistence fails.
    pub async fn create_workflow(&self, request: CreateWorkflow) -> WorkflowAdminResult<Workflow> {
        let name = WorkflowName::new(request.name)?;
        let scope = match request.project_id {
            Some(project_id) => WorkflowScope::project(request.org_id, project_id),
            None => WorkflowScope::org_wide(request.org_id),
        };
        let workflow = Workflow::create(scope, name, self.clock.utc());
        self.repository.insert_workflow(&workflow).await?;
        Ok(workflow)
    }

    /// Activates a workflow and deactivates its siblings per the cascade
    /// scope. Returns the identifiers of the deactivated siblings.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowNotFound`] when the
    /// target is absent.
    pub async fn activate_workflow(
        &self,
        id: WorkflowId,
        cascade: CascadeScope,
    ) -> WorkflowAdminResult<Vec<WorkflowId>> {
        let target = self
            .repository
            .find_workflow(id)
            .await?
            .ok_or(WorkflowRepositoryError::WorkflowNotFound(id))?;
        self.repository.update_workflow_active(id, true).await?;

        let siblings = self.cascade_targets(&target, cascade).await?;
        for sibling in &siblings {
            self.repository.update_workflow_active(*sibling, false).await?;
        }
        if !siblings.is_empty() {
            tracing::info!(
                workflow_id = %id,
                deactivated = siblings.len(),
                "exclusive activation deactivated sibling workflows",
            );
        }
        Ok(siblings)
    }

    /// Deactivates a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowNotFound`] when absent.
    pub async fn deactivate_workflow(&self, id: WorkflowId) -> WorkflowAdminResult<()> {
        self.repository.update_workflow_active(id, false).await?;
        Ok(())
    }

    /// Parses the trigger and appends a rule to the workflow.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown resource types or states,
    /// and repository errors for an absent workflow.
    pub async fn add_rule(&self, request: AddRule) -> WorkflowAdminResult<Rule> {
        let state = TriggerState::parse(&request.resource_type, &request.to_state)?;
        let mut trigger = RuleTrigger::new(state);
        if let Some(task_type) = request.task_type_id {
            trigger = trigger.with_task_type(task_type);
        }
        let position = self
            .repository
            .next_rule_position(request.workflow_id)
            .await?;
        let rule = Rule::create(request.workflow_id, position, trigger, self.clock.utc());
        self.repository.insert_rule(&rule).await?;
        Ok(rule)
    }

    /// Sets a rule's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RuleNotFound`] when absent.
    pub async fn set_rule_active(&self, id: RuleId, active: bool) -> WorkflowAdminResult<()> {
        self.repository.update_rule_active(id, active).await?;
        Ok(())
    }

    /// Validates and stores a task template.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or out-of-range
    /// priority.
    pub async fn create_template(
        &self,
        request: CreateTemplate,
    ) -> WorkflowAdminResult<TaskTemplate> {
        let name = TaskTitle::new(request.name).map_err(validation("name"))?;
        let priority = Priority::new(request.priority).map_err(validation("priority"))?;
        let template = TaskTemplate::create(
            request.org_id,
            name,
            request.type_id,
            priority,
            request.description,
            self.clock.utc(),
        );
        self.repository.insert_template(&template).await?;
        Ok(template)
    }

    /// Attaches a template to a rule at the given execution order.
    ///
    /// # Errors
    ///
    /// Returns repository errors when either side is absent.
    pub async fn attach_template(
        &self,
        rule_id: RuleId,
        template_id: TemplateId,
        execution_order: i32,
    ) -> WorkflowAdminResult<()> {
        let binding = TemplateBinding::new(template_id, execution_order);
        self.repository.attach_template(rule_id, binding).await?;
        Ok(())
    }

    /// Deletes a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowHasRules`] under
    /// [`DeleteMode::Restrict`] when rules still reference it.
    pub async fn delete_workflow(
        &self,
        id: WorkflowId,
        mode: DeleteMode,
    ) -> WorkflowAdminResult<()> {
        self.repository.delete_workflow(id, mode).await?;
        Ok(())
    }

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RuleHasTemplates`] under
    /// [`DeleteMode::Restrict`] when bindings still exist.
    pub async fn delete_rule(&self, id: RuleId, mode: DeleteMode) -> WorkflowAdminResult<()> {
        self.repository.delete_rule(id, mode).await?;
        Ok(())
    }

    async fn cascade_targets(
        &self,
        target: &Workflow,
        cascade: CascadeScope,
    ) -> WorkflowAdminResult<Vec<WorkflowId>> {
        let siblings = match cascade {
            CascadeScope::None => Vec::new(),
            CascadeScope::Project => self
                .repository
                .list_workflows(target.scope().org_id())
                .await?
                .into_iter()
                .filter(|other| {
                    other.id() != target.id()
                        && other.active()
                        && other.scope().project_id() == target.scope().project_id()
                })
                .map(|other| other.id())
                .collect(),
            CascadeScope::Organization => self
                .repository
                .list_workflows(target.scope().org_id())
                .await?
                .into_iter()
                .filter(|other| other.id() != target.id() && other.active())
                .map(|other| other.id())
                .collect(),
        };
        Ok(siblings)
    }
}

fn validation(
    field: &'static str,
) -> impl FnOnce(TaskValidationError) -> WorkflowAdminError {
    move |err| WorkflowAdminError::Validation {
        field,
        reason: err.to_string(),
    }
}
