//! In-memory workflow definition repository.

use crate::automation::domain::{
    Rule, RuleId, TaskTemplate, TemplateBinding, TemplateId, Workflow, WorkflowId,
};
use crate::automation::ports::repository::{
    DeleteMode, WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult,
};
use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::OrgId;
use async_trait::async_trait;

/// In-memory [`WorkflowRepository`] backed by the shared pool store.
#[derive(Debug, Clone)]
pub struct InMemoryWorkflowRepository {
    store: InMemoryStore,
}

impl InMemoryWorkflowRepository {
    /// Creates a repository over the shared store.
    #[must_use]
    pub const fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn insert_workflow(&self, workflow: &Workflow) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        if state.workflows.contains_key(&workflow.id()) {
            return Err(WorkflowRepositoryError::DuplicateWorkflow(workflow.id()));
        }
        state.workflows.insert(workflow.id(), workflow.clone());
        Ok(())
    }

    async fn find_workflow(&self, id: WorkflowId) -> WorkflowRepositoryResult<Option<Workflow>> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        Ok(state.workflows.get(&id).cloned())
    }

    async fn list_workflows(&self, org_id: OrgId) -> WorkflowRepositoryResult<Vec<Workflow>> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let mut workflows: Vec<Workflow> = state
            .workflows
            .values()
            .filter(|workflow| workflow.scope().org_id() == org_id)
            .cloned()
            .collect();
        workflows.sort_by_key(Workflow::created_at);
        Ok(workflows)
    }

    async fn update_workflow_active(
        &self,
        id: WorkflowId,
        active: bool,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let workflow = state
            .workflows
            .get_mut(&id)
            .ok_or(WorkflowRepositoryError::WorkflowNotFound(id))?;
        workflow.set_active(active);
        Ok(())
    }

    async fn delete_workflow(
        &self,
        id: WorkflowId,
        mode: DeleteMode,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        if !state.workflows.contains_key(&id) {
            return Err(WorkflowRepositoryError::WorkflowNotFound(id));
        }
        let rule_count = state
            .rules
            .values()
            .filter(|rule| rule.workflow_id() == id)
            .count() as u64;
        if rule_count > 0 && matches!(mode, DeleteMode::Restrict) {
            return Err(WorkflowRepositoryError::WorkflowHasRules { id, rule_count });
        }
        state.rules.retain(|_, rule| rule.workflow_id() != id);
        state.workflows.remove(&id);
        Ok(())
    }

    async fn insert_rule(&self, rule: &Rule) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        if !state.workflows.contains_key(&rule.workflow_id()) {
            return Err(WorkflowRepositoryError::WorkflowNotFound(rule.workflow_id()));
        }
        if state.rules.contains_key(&rule.id()) {
            return Err(WorkflowRepositoryError::DuplicateRule(rule.id()));
        }
        state.rules.insert(rule.id(), rule.clone());
        Ok(())
    }

    async fn find_rule(&self, id: RuleId) -> WorkflowRepositoryResult<Option<Rule>> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        Ok(state.rules.get(&id).cloned())
    }

    async fn list_rules(&self, workflow_id: WorkflowId) -> WorkflowRepositoryResult<Vec<Rule>> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let mut rules: Vec<Rule> = state
            .rules
            .values()
            .filter(|rule| rule.workflow_id() == workflow_id)
            .cloned()
            .collect();
        rules.sort_by_key(Rule::position);
        Ok(rules)
    }

    async fn next_rule_position(
        &self,
        workflow_id: WorkflowId,
    ) -> WorkflowRepositoryResult<i32> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let max = state
            .rules
            .values()
            .filter(|rule| rule.workflow_id() == workflow_id)
            .map(Rule::position)
            .max();
        Ok(max.map_or(0, |position| position + 1))
    }

    async fn update_rule_active(&self, id: RuleId, active: bool) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let rule = state
            .rules
            .get_mut(&id)
            .ok_or(WorkflowRepositoryError::RuleNotFound(id))?;
        rule.set_active(active);
        Ok(())
    }

    async fn delete_rule(&self, id: RuleId, mode: DeleteMode) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        let rule = state
            .rules
            .get(&id)
            .ok_or(WorkflowRepositoryError::RuleNotFound(id))?;
        let template_count = rule.templates().len() as u64;
        if template_count > 0 && matches!(mode, DeleteMode::Restrict) {
            return Err(WorkflowRepositoryError::RuleHasTemplates { id, template_count });
        }
        state.rules.remove(&id);
        Ok(())
    }

    async fn insert_template(&self, template: &TaskTemplate) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        if state.templates.contains_key(&template.id()) {
            return Err(WorkflowRepositoryError::DuplicateTemplate(template.id()));
        }
        state.templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn find_template(
        &self,
        id: TemplateId,
    ) -> WorkflowRepositoryResult<Option<TaskTemplate>> {
        let state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        Ok(state.templates.get(&id).cloned())
    }

    async fn attach_template(
        &self,
        rule_id: RuleId,
        binding: TemplateBinding,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.store.lock().map_err(WorkflowRepositoryError::persistence)?;
        if !state.templates.contains_key(&binding.template_id()) {
            return Err(WorkflowRepositoryError::TemplateNotFound(
                binding.template_id(),
            ));
        }
        let rule = state
            .rules
            .get_mut(&rule_id)
            .ok_or(WorkflowRepositoryError::RuleNotFound(rule_id))?;
        rule.attach_template(binding);
        Ok(())
    }
}
