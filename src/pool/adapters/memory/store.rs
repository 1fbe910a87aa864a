//! In-memory transactional store shared by every in-memory adapter.
//!
//! One [`InMemoryStore`] owns the whole pool state behind a mutex; the
//! automation adapters hold clones of it so transactional rule evaluation
//! sees the same workflows, templates, and ledger the admin plane writes.
//! Transactions run against a cloned scratch state that replaces the
//! shared state only on success, which gives the same all-or-nothing
//! semantics as a database rollback.

use crate::automation::domain::{
    OriginRef, RuleExecution, RuleId, StateChangeEvent, TaskTemplate, TemplateId,
};
use crate::automation::ports::evaluation::{CandidateRule, EvaluationStore};
use crate::pool::domain::{
    Card, CardId, Milestone, MilestoneId, MilestoneProgress, Task, TaskCounts, TaskId, TaskState,
    Version,
};
use crate::pool::ports::repository::{
    BoardRepository, BoardRepositoryError, BoardRepositoryResult,
};
use crate::pool::ports::store::{
    MutationTransaction, StoreError, StoreResult, TaskStore, UpdateOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::automation::domain::{Rule, Workflow, WorkflowId};

/// Whole-pool state held by the in-memory store.
#[derive(Debug, Clone, Default)]
pub(crate) struct PoolState {
    pub(crate) tasks: HashMap<TaskId, Task>,
    pub(crate) cards: HashMap<CardId, Card>,
    pub(crate) milestones: HashMap<MilestoneId, Milestone>,
    pub(crate) workflows: HashMap<WorkflowId, Workflow>,
    pub(crate) rules: HashMap<RuleId, Rule>,
    pub(crate) templates: HashMap<TemplateId, TaskTemplate>,
    pub(crate) executions: Vec<RuleExecution>,
}

impl PoolState {
    /// Counts a card's child tasks by lifecycle state.
    pub(crate) fn card_counts(&self, card_id: CardId) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in self.tasks.values() {
            if task.card_id() != Some(card_id) {
                continue;
            }
            counts.total += 1;
            match task.state() {
                TaskState::Completed { .. } => counts.completed += 1,
                TaskState::Available => counts.available += 1,
                TaskState::Claimed { .. } => {}
            }
        }
        counts
    }

    /// Folds per-card counts into a milestone progress rollup.
    pub(crate) fn milestone_progress(&self, milestone_id: MilestoneId) -> MilestoneProgress {
        let per_card = self
            .cards
            .values()
            .filter(|card| card.milestone_id() == Some(milestone_id))
            .map(|card| self.card_counts(card.id()));
        MilestoneProgress::from_card_counts(per_card)
    }

    /// Loads candidate rules for an event: scope covered, trigger state
    /// matched, ordered by workflow creation time then rule position.
    pub(crate) fn candidate_rules(&self, event: &StateChangeEvent) -> Vec<CandidateRule> {
        let mut workflows: Vec<&Workflow> = self
            .workflows
            .values()
            .filter(|workflow| {
                workflow
                    .scope()
                    .covers(event.org_id(), event.project_id())
            })
            .collect();
        workflows.sort_by_key(|workflow| workflow.created_at());

        let mut candidates = Vec::new();
        for workflow in workflows {
            let mut rules: Vec<&Rule> = self
                .rules
                .values()
                .filter(|rule| {
                    rule.workflow_id() == workflow.id() && rule.trigger().state() == event.to()
                })
                .collect();
            rules.sort_by_key(|rule| rule.position());
            for rule in rules {
                candidates.push(CandidateRule::new(
                    rule.clone(),
                    workflow.scope(),
                    workflow.active(),
                ));
            }
        }
        candidates
    }

    pub(crate) fn has_applied_execution(&self, rule_id: RuleId, origin: OriginRef) -> bool {
        self.executions.iter().any(|execution| {
            execution.rule_id() == rule_id
                && execution.origin() == origin
                && execution.outcome().is_applied()
        })
    }
}

/// Thread-safe in-memory store implementing the transactional and board
/// ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<PoolState>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, PoolState>, std::io::Error> {
        self.state
            .lock()
            .map_err(|err| std::io::Error::other(err.to_string()))
    }
}

/// Transaction over a scratch copy of the pool state.
struct MemoryTransaction<'a> {
    state: &'a mut PoolState,
}

impl EvaluationStore for MemoryTransaction<'_> {
    fn candidate_rules(&mut self, event: &StateChangeEvent) -> StoreResult<Vec<CandidateRule>> {
        Ok(self.state.candidate_rules(event))
    }

    fn load_template(&mut self, id: TemplateId) -> StoreResult<Option<TaskTemplate>> {
        Ok(self.state.templates.get(&id).cloned())
    }

    fn has_applied_execution(&mut self, rule_id: RuleId, origin: OriginRef) -> StoreResult<bool> {
        Ok(self.state.has_applied_execution(rule_id, origin))
    }

    fn insert_spawned_task(&mut self, task: &Task) -> StoreResult<()> {
        self.state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    fn append_execution(&mut self, execution: &RuleExecution) -> StoreResult<()> {
        self.state.executions.push(*execution);
        Ok(())
    }
}

impl MutationTransaction for MemoryTransaction<'_> {
    fn load_task(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        self.state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    fn update_task_guarded(&mut self, task: &Task, expected: Version) -> StoreResult<UpdateOutcome> {
        match self.state.tasks.get(&task.id()) {
            None => Ok(UpdateOutcome::Missing),
            Some(stored) if stored.version() != expected => Ok(UpdateOutcome::VersionConflict {
                actual: stored.version(),
            }),
            Some(_) => {
                self.state.tasks.insert(task.id(), task.clone());
                Ok(UpdateOutcome::Updated)
            }
        }
    }

    fn delete_task_guarded(&mut self, id: TaskId, expected: Version) -> StoreResult<UpdateOutcome> {
        match self.state.tasks.get(&id) {
            None => Ok(UpdateOutcome::Missing),
            Some(stored) if stored.version() != expected => Ok(UpdateOutcome::VersionConflict {
                actual: stored.version(),
            }),
            Some(_) => {
                self.state.tasks.remove(&id);
                Ok(UpdateOutcome::Updated)
            }
        }
    }

    fn load_card(&mut self, id: CardId) -> StoreResult<Option<Card>> {
        Ok(self.state.cards.get(&id).cloned())
    }

    fn card_task_counts(&mut self, id: CardId) -> StoreResult<TaskCounts> {
        Ok(self.state.card_counts(id))
    }

    fn milestone_progress(&mut self, id: MilestoneId) -> StoreResult<MilestoneProgress> {
        Ok(self.state.milestone_progress(id))
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn MutationTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut guard = self
            .lock()
            .map_err(|err| E::from(StoreError::persistence(err)))?;
        let mut scratch = guard.clone();
        let mut transaction = MemoryTransaction {
            state: &mut scratch,
        };
        let value = work(&mut transaction)?;
        *guard = scratch;
        Ok(value)
    }
}

#[async_trait]
impl BoardRepository for InMemoryStore {
    async fn insert_card(&self, card: &Card) -> BoardRepositoryResult<()> {
        let mut state = self.lock().map_err(BoardRepositoryError::persistence)?;
        if state.cards.contains_key(&card.id()) {
            return Err(BoardRepositoryError::DuplicateCard(card.id()));
        }
        state.cards.insert(card.id(), card.clone());
        Ok(())
    }

    async fn insert_milestone(&self, milestone: &Milestone) -> BoardRepositoryResult<()> {
        let mut state = self.lock().map_err(BoardRepositoryError::persistence)?;
        if state.milestones.contains_key(&milestone.id()) {
            return Err(BoardRepositoryError::DuplicateMilestone(milestone.id()));
        }
        state.milestones.insert(milestone.id(), milestone.clone());
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> BoardRepositoryResult<Option<Task>> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_card(&self, id: CardId) -> BoardRepositoryResult<Option<Card>> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        Ok(state.cards.get(&id).cloned())
    }

    async fn find_milestone(&self, id: MilestoneId) -> BoardRepositoryResult<Option<Milestone>> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        Ok(state.milestones.get(&id).cloned())
    }

    async fn list_tasks_by_card(&self, id: CardId) -> BoardRepositoryResult<Vec<Task>> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.card_id() == Some(id))
            .cloned()
            .collect();
        tasks.sort_by_key(Task::created_at);
        Ok(tasks)
    }

    async fn card_task_counts(&self, id: CardId) -> BoardRepositoryResult<TaskCounts> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        Ok(state.card_counts(id))
    }

    async fn milestone_card_counts(
        &self,
        id: MilestoneId,
    ) -> BoardRepositoryResult<Vec<TaskCounts>> {
        let state = self.lock().map_err(BoardRepositoryError::persistence)?;
        let counts = state
            .cards
            .values()
            .filter(|card| card.milestone_id() == Some(id))
            .map(|card| state.card_counts(card.id()))
            .collect();
        Ok(counts)
    }
}
