//! Rule aggregate: a trigger plus the ordered templates it instantiates.

use super::{RuleId, StateChangeEvent, TemplateId, TriggerState, WorkflowId};
use crate::pool::domain::TaskTypeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a rule fires on: a typed target state, optionally narrowed to one
/// task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTrigger {
    state: TriggerState,
    task_type: Option<TaskTypeId>,
}

impl RuleTrigger {
    /// Creates a trigger matching any task type.
    #[must_use]
    pub const fn new(state: TriggerState) -> Self {
        Self {
            state,
            task_type: None,
        }
    }

    /// Narrows the trigger to one task type.
    #[must_use]
    pub const fn with_task_type(mut self, task_type: TaskTypeId) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Returns the target state.
    #[must_use]
    pub const fn state(&self) -> TriggerState {
        self.state
    }

    /// Returns the task-type narrowing, if any.
    #[must_use]
    pub const fn task_type(&self) -> Option<TaskTypeId> {
        self.task_type
    }

    /// Returns `true` when the trigger matches the event, including the
    /// task-type narrowing.
    #[must_use]
    pub fn matches(&self, event: &StateChangeEvent) -> bool {
        self.state == event.to()
            && self
                .task_type
                .is_none_or(|wanted| event.task_type() == Some(wanted))
    }
}

/// Reference from a rule to a template, with its execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBinding {
    template_id: TemplateId,
    execution_order: i32,
}

impl TemplateBinding {
    /// Creates a binding.
    #[must_use]
    pub const fn new(template_id: TemplateId, execution_order: i32) -> Self {
        Self {
            template_id,
            execution_order,
        }
    }

    /// Returns the referenced template.
    #[must_use]
    pub const fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Returns the instantiation order within the rule.
    #[must_use]
    pub const fn execution_order(&self) -> i32 {
        self.execution_order
    }
}

/// Rule aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    id: RuleId,
    workflow_id: WorkflowId,
    position: i32,
    trigger: RuleTrigger,
    active: bool,
    templates: Vec<TemplateBinding>,
    created_at: DateTime<Utc>,
}

impl Rule {
    /// Creates a fresh, active rule with no templates attached.
    #[must_use]
    pub fn create(
        workflow_id: WorkflowId,
        position: i32,
        trigger: RuleTrigger,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RuleId::new(),
            workflow_id,
            position,
            trigger,
            active: true,
            templates: Vec::new(),
            created_at,
        }
    }

    /// Reconstructs a rule from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: RuleId,
        workflow_id: WorkflowId,
        position: i32,
        trigger: RuleTrigger,
        active: bool,
        templates: Vec<TemplateBinding>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            workflow_id,
            position,
            trigger,
            active,
            templates,
            created_at,
        }
    }

    /// Returns the rule identifier.
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the owning workflow.
    #[must_use]
    pub const fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// Returns the evaluation position within the workflow.
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    /// Returns the trigger.
    #[must_use]
    pub const fn trigger(&self) -> RuleTrigger {
        self.trigger
    }

    /// Returns whether the rule participates in evaluation.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    /// Returns the attached template bindings in attachment order.
    #[must_use]
    pub fn templates(&self) -> &[TemplateBinding] {
        &self.templates
    }

    /// Returns the attached template bindings sorted by execution order.
    #[must_use]
    pub fn templates_in_order(&self) -> Vec<TemplateBinding> {
        let mut ordered = self.templates.clone();
        ordered.sort_by_key(TemplateBinding::execution_order);
        ordered
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Toggles the active flag.
    pub const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Attaches a template binding.
    pub fn attach_template(&mut self, binding: TemplateBinding) {
        self.templates.push(binding);
    }
}
