//! Workflow aggregate: a named, scoped container of ordered rules.

use super::{WorkflowDomainError, WorkflowId};
use crate::pool::domain::{OrgId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-empty workflow name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowName(String);

impl WorkflowName {
    /// Creates a validated workflow name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyName`] when the value is empty
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ownership scope of a workflow: an organisation, optionally narrowed to
/// one project. A missing project means the workflow is org-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowScope {
    org_id: OrgId,
    project_id: Option<ProjectId>,
}

impl WorkflowScope {
    /// Creates an org-wide scope.
    #[must_use]
    pub const fn org_wide(org_id: OrgId) -> Self {
        Self {
            org_id,
            project_id: None,
        }
    }

    /// Creates a project-scoped scope.
    #[must_use]
    pub const fn project(org_id: OrgId, project_id: ProjectId) -> Self {
        Self {
            org_id,
            project_id: Some(project_id),
        }
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Returns the project narrowing, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns `true` when the scope is narrowed to one project.
    #[must_use]
    pub const fn is_project_scoped(&self) -> bool {
        self.project_id.is_some()
    }

    /// Returns `true` when the scope covers the given org/project pair.
    #[must_use]
    pub fn covers(&self, org_id: OrgId, project_id: ProjectId) -> bool {
        self.org_id == org_id && self.project_id.is_none_or(|scoped| scoped == project_id)
    }
}

/// Workflow aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    id: WorkflowId,
    scope: WorkflowScope,
    name: WorkflowName,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a fresh, active workflow.
    #[must_use]
    pub fn create(scope: WorkflowScope, name: WorkflowName, created_at: DateTime<Utc>) -> Self {
        Self {
            id: WorkflowId::new(),
            scope,
            name,
            active: true,
            created_at,
        }
    }

    /// Reconstructs a workflow from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: WorkflowId,
        scope: WorkflowScope,
        name: WorkflowName,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            scope,
            name,
            active,
            created_at,
        }
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the ownership scope.
    #[must_use]
    pub const fn scope(&self) -> WorkflowScope {
        self.scope
    }

    /// Returns the workflow name.
    #[must_use]
    pub const fn name(&self) -> &WorkflowName {
        &self.name
    }

    /// Returns whether the workflow participates in rule evaluation.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
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
}
