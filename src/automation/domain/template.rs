//! Task templates: blueprints copied into fresh tasks by applied rules.

use super::TemplateId;
use crate::pool::domain::{NewTaskData, OrgId, Priority, ProjectId, TaskTitle, TaskTypeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blueprint for task creation. Copied field-by-field on instantiation,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    id: TemplateId,
    org_id: OrgId,
    name: TaskTitle,
    type_id: TaskTypeId,
    priority: Priority,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TaskTemplate {
    /// Creates a fresh template.
    #[must_use]
    pub fn create(
        org_id: OrgId,
        name: TaskTitle,
        type_id: TaskTypeId,
        priority: Priority,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TemplateId::new(),
            org_id,
            name,
            type_id,
            priority,
            description,
            created_at,
        }
    }

    /// Reconstructs a template from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: TemplateId,
        org_id: OrgId,
        name: TaskTitle,
        type_id: TaskTypeId,
        priority: Priority,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            org_id,
            name,
            type_id,
            priority,
            description,
            created_at,
        }
    }

    /// Returns the template identifier.
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Returns the template name, used as the spawned task's title.
    #[must_use]
    pub const fn name(&self) -> &TaskTitle {
        &self.name
    }

    /// Returns the task type stamped onto spawned tasks.
    #[must_use]
    pub const fn type_id(&self) -> TaskTypeId {
        self.type_id
    }

    /// Returns the priority stamped onto spawned tasks.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the description copied onto spawned tasks, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Copies the template into creation data for a task in the given
    /// project, credited to the triggering user.
    #[must_use]
    pub fn instantiate(&self, project_id: ProjectId, created_by: UserId) -> NewTaskData {
        NewTaskData {
            org_id: self.org_id,
            project_id,
            type_id: self.type_id,
            card_id: None,
            title: self.name.clone(),
            description: self.description.clone(),
            priority: self.priority,
            created_by,
        }
    }
}
