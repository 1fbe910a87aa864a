//! Repository port for workflow, rule, and template definitions.

use crate::automation::domain::{
    Rule, RuleId, TaskTemplate, TemplateBinding, TemplateId, Workflow, WorkflowId,
};
use crate::pool::domain::OrgId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workflow repository operations.
pub type WorkflowRepositoryResult<T> = Result<T, WorkflowRepositoryError>;

/// How a delete treats children still referencing the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Refuse when children exist.
    Restrict,
    /// Delete children along with the target.
    Cascade,
}

/// Persistence contract for workflow definitions.
///
/// Definitions are read-mostly; the evaluation path re-reads activity
/// flags inside the mutation transaction, so this port only serves the
/// administration plane.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Stores a new workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateWorkflow`] when the
    /// identifier already exists.
    async fn insert_workflow(&self, workflow: &Workflow) -> WorkflowRepositoryResult<()>;

    /// Finds a workflow by identifier. Returns `None` when absent.
    async fn find_workflow(&self, id: WorkflowId) -> WorkflowRepositoryResult<Option<Workflow>>;

    /// Returns all workflows owned by the organisation, ordered by
    /// creation time.
    async fn list_workflows(&self, org_id: OrgId) -> WorkflowRepositoryResult<Vec<Workflow>>;

    /// Sets a workflow's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowNotFound`] when absent.
    async fn update_workflow_active(
        &self,
        id: WorkflowId,
        active: bool,
    ) -> WorkflowRepositoryResult<()>;

    /// Deletes a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowHasRules`] under
    /// [`DeleteMode::Restrict`] when rules still reference it.
    async fn delete_workflow(
        &self,
        id: WorkflowId,
        mode: DeleteMode,
    ) -> WorkflowRepositoryResult<()>;

    /// Stores a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::WorkflowNotFound`] when the
    /// owning workflow is absent.
    async fn insert_rule(&self, rule: &Rule) -> WorkflowRepositoryResult<()>;

    /// Finds a rule by identifier. Returns `None` when absent.
    async fn find_rule(&self, id: RuleId) -> WorkflowRepositoryResult<Option<Rule>>;

    /// Returns a workflow's rules ordered by position.
    async fn list_rules(&self, workflow_id: WorkflowId) -> WorkflowRepositoryResult<Vec<Rule>>;

    /// Returns the next free rule position within a workflow.
    async fn next_rule_position(&self, workflow_id: WorkflowId)
    -> WorkflowRepositoryResult<i32>;

    /// Sets a rule's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RuleNotFound`] when absent.
    async fn update_rule_active(&self, id: RuleId, active: bool) -> WorkflowRepositoryResult<()>;

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RuleHasTemplates`] under
    /// [`DeleteMode::Restrict`] when template bindings still exist.
    async fn delete_rule(&self, id: RuleId, mode: DeleteMode) -> WorkflowRepositoryResult<()>;

    /// Stores a new task template.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateTemplate`] when the
    /// identifier already exists.
    async fn insert_template(&self, template: &TaskTemplate) -> WorkflowRepositoryResult<()>;

    /// Finds a template by identifier. Returns `None` when absent.
    async fn find_template(&self, id: TemplateId)
    -> WorkflowRepositoryResult<Option<TaskTemplate>>;

    /// Attaches a template to a rule with an execution order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RuleNotFound`] or
    /// [`WorkflowRepositoryError::TemplateNotFound`] when either side is
    /// absent.
    async fn attach_template(
        &self,
        rule_id: RuleId,
        binding: TemplateBinding,
    ) -> WorkflowRepositoryResult<()>;
}

/// Errors returned by workflow repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowRepositoryError {
    /// The workflow was not found.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// The rule was not found.
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),

    /// The template was not found.
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// A workflow with the same identifier already exists.
    #[error("duplicate workflow identifier: {0}")]
    DuplicateWorkflow(WorkflowId),

    /// A rule with the same identifier already exists.
    #[error("duplicate rule identifier: {0}")]
    DuplicateRule(RuleId),

    /// A template with the same identifier already exists.
    #[error("duplicate template identifier: {0}")]
    DuplicateTemplate(TemplateId),

    /// The workflow still holds rules and the delete was restrictive.
    #[error("workflow {id} still holds {rule_count} rule(s)")]
    WorkflowHasRules {
        /// The workflow that was not deleted.
        id: WorkflowId,
        /// Number of rules still attached.
        rule_count: u64,
    },

    /// The rule still holds template bindings and the delete was
    /// restrictive.
    #[error("rule {id} still holds {template_count} template binding(s)")]
    RuleHasTemplates {
        /// The rule that was not deleted.
        id: RuleId,
        /// Number of bindings still attached.
        template_count: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
