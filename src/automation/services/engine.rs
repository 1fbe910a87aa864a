//! Rule evaluation engine.
//!
//! Runs synchronously inside the mutation transaction: given a state-change
//! event, it loads matching candidate rules, applies the fixed-order
//! suppression checks, instantiates templates for applied rules, and
//! appends one ledger row per candidate — applied or suppressed.

use crate::automation::domain::{
    ExecutionOutcome, RuleExecution, StateChangeEvent, SuppressionReason,
};
use crate::automation::ports::evaluation::{CandidateRule, EvaluationStore};
use crate::pool::domain::{Task, UserId};
use crate::pool::ports::store::{StoreError, StoreResult};
use chrono::{DateTime, Utc};

/// Evaluates rules against state-change events.
///
/// Stateless; all reads and writes go through the [`EvaluationStore`]
/// handed in per evaluation, which scopes them to the caller's
/// transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluates every candidate rule for the event and returns the ledger
    /// rows recorded, in evaluation order.
    ///
    /// Candidates are ordered project-scoped before org-wide, then by the
    /// store's (workflow creation, rule position) order. Each candidate
    /// yields exactly one ledger row; rule-local failures suppress the
    /// individual rule and evaluation continues.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for persistence failures, which must
    /// abort the caller's transaction.
    pub fn evaluate<S>(
        &self,
        store: &mut S,
        event: &StateChangeEvent,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<RuleExecution>>
    where
        S: EvaluationStore + ?Sized,
    {
        let mut candidates = store.candidate_rules(event)?;
        // Stable sort: preserves the store's (workflow, position) order
        // within each scope class.
        candidates.sort_by_key(|candidate| usize::from(!candidate.scope().is_project_scoped()));

        let mut recorded = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let outcome = self.evaluate_rule(store, candidate, event, now)?;
            tracing::debug!(
                rule_id = %candidate.rule().id(),
                origin = ?event.origin(),
                outcome = outcome.outcome_str(),
                reason = outcome.suppression_reason().map(SuppressionReason::as_str),
                "rule evaluated",
            );
            let execution = RuleExecution::record(
                candidate.rule().id(),
                event.origin(),
                outcome,
                event.triggered_by(),
                now,
            );
            store.append_execution(&execution)?;
            recorded.push(execution);
        }
        Ok(recorded)
    }

    fn evaluate_rule<S>(
        &self,
        store: &mut S,
        candidate: &CandidateRule,
        event: &StateChangeEvent,
        now: DateTime<Utc>,
    ) -> StoreResult<ExecutionOutcome>
    where
        S: EvaluationStore + ?Sized,
    {
        let rule = candidate.rule();

        // Fixed-order suppression checks; first match wins.
        if !candidate.workflow_active() || !rule.active() {
            return Ok(ExecutionOutcome::Suppressed(SuppressionReason::Inactive));
        }
        let Some(user) = event.triggered_by() else {
            return Ok(ExecutionOutcome::Suppressed(
                SuppressionReason::NotUserTriggered,
            ));
        };
        if !rule.trigger().matches(event) {
            return Ok(ExecutionOutcome::Suppressed(SuppressionReason::NotMatching));
        }
        if store.has_applied_execution(rule.id(), event.origin())? {
            return Ok(ExecutionOutcome::Suppressed(SuppressionReason::Idempotent));
        }

        let spawned = match self.instantiate_templates(store, candidate, event, user, now) {
            Ok(tasks) => tasks,
            Err(TemplateFailure::Unresolved) => {
                return Ok(ExecutionOutcome::Suppressed(
                    SuppressionReason::TemplateError,
                ));
            }
            Err(TemplateFailure::Store(err)) => return Err(err),
        };
        for task in &spawned {
            store.insert_spawned_task(task)?;
        }
        Ok(ExecutionOutcome::Applied)
    }

    /// Resolves every binding before inserting anything, so a broken
    /// binding suppresses the rule without leaving partial spawns behind.
    fn instantiate_templates<S>(
        &self,
        store: &mut S,
        candidate: &CandidateRule,
        event: &StateChangeEvent,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, TemplateFailure>
    where
        S: EvaluationStore + ?Sized,
    {
        let bindings = candidate.rule().templates_in_order();
        let mut spawned = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let Some(template) = store.load_template(binding.template_id())? else {
                tracing::warn!(
                    rule_id = %candidate.rule().id(),
                    template_id = %binding.template_id(),
                    "rule references a missing template",
                );
                return Err(TemplateFailure::Unresolved);
            };
            let data = template.instantiate(event.project_id(), user);
            spawned.push(Task::create(data, now));
        }
        Ok(spawned)
    }
}

enum TemplateFailure {
    Unresolved,
    Store(StoreError),
}

impl From<StoreError> for TemplateFailure {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
