//! Evaluation surface the rule engine uses inside a mutation transaction.

use crate::automation::domain::{
    Rule, RuleExecution, RuleId, StateChangeEvent, TaskTemplate, TemplateId, WorkflowScope,
};
use crate::automation::domain::OriginRef;
use crate::pool::domain::Task;
use crate::pool::ports::store::StoreResult;

/// A rule whose trigger state matches an event, joined with the owning
/// workflow's scope and activity flag.
///
/// Candidates are matched on trigger state only; the engine itself applies
/// the active, user-trigger, task-type, and idempotency checks so every
/// suppression lands in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRule {
    rule: Rule,
    scope: WorkflowScope,
    workflow_active: bool,
}

impl CandidateRule {
    /// Creates a candidate from a matched rule and its workflow context.
    #[must_use]
    pub const fn new(rule: Rule, scope: WorkflowScope, workflow_active: bool) -> Self {
        Self {
            rule,
            scope,
            workflow_active,
        }
    }

    /// Returns the matched rule.
    #[must_use]
    pub const fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Returns the owning workflow's scope.
    #[must_use]
    pub const fn scope(&self) -> WorkflowScope {
        self.scope
    }

    /// Returns whether the owning workflow was active when loaded.
    #[must_use]
    pub const fn workflow_active(&self) -> bool {
        self.workflow_active
    }
}

/// Reads and writes the rule engine performs inside the transaction.
///
/// Implemented by every [`MutationTransaction`], so rule side effects share
/// the originating mutation's atomicity.
///
/// [`MutationTransaction`]: crate::pool::ports::store::MutationTransaction
pub trait EvaluationStore {
    /// Loads the rules whose trigger state matches the event, scoped to
    /// the event's organisation and project, ordered by workflow creation
    /// time and rule position.
    ///
    /// # Errors
    ///
    /// Returns a store error on persistence failure.
    fn candidate_rules(&mut self, event: &StateChangeEvent) -> StoreResult<Vec<CandidateRule>>;

    /// Loads a task template by identifier. Returns `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns a store error on persistence failure.
    fn load_template(&mut self, id: TemplateId) -> StoreResult<Option<TaskTemplate>>;

    /// Returns `true` when an applied ledger row already exists for the
    /// rule/origin pair.
    ///
    /// # Errors
    ///
    /// Returns a store error on persistence failure.
    fn has_applied_execution(&mut self, rule_id: RuleId, origin: OriginRef) -> StoreResult<bool>;

    /// Inserts a task spawned from a template.
    ///
    /// # Errors
    ///
    /// Returns a store error on persistence failure.
    fn insert_spawned_task(&mut self, task: &Task) -> StoreResult<()>;

    /// Appends one ledger row. The ledger is insert-only; no update or
    /// delete surface exists.
    ///
    /// # Errors
    ///
    /// Returns a store error on persistence failure.
    fn append_execution(&mut self, execution: &RuleExecution) -> StoreResult<()>;
}
