//! Application services for workflow automation.

mod admin;
mod engine;
mod metrics;

pub use admin::{
    AddRule, CascadeScope, CreateTemplate, CreateWorkflow, WorkflowAdminError,
    WorkflowAdminResult, WorkflowAdminService,
};
pub use engine::RuleEngine;
pub use metrics::{
    MetricsError, MetricsResult, MetricsWindow, RuleMetrics, RuleMetricsService, WorkflowMetrics,
    WorkflowRuleMetrics,
};
