//! Rule engine tests: suppression taxonomy, idempotency, ordering, and
//! failure isolation, evaluated through the in-memory transaction.

use std::sync::Arc;

use crate::automation::adapters::memory::InMemoryWorkflowRepository;
use crate::automation::domain::{
    ExecutionOutcome, OriginRef, Rule, RuleExecution, RuleId, StateChangeEvent,
    SuppressionReason, TaskTemplate, TaskTrigger, TemplateBinding, TemplateId, TriggerState,
};
use crate::automation::ports::evaluation::{CandidateRule, EvaluationStore};
use crate::automation::services::{
    AddRule, CreateTemplate, CreateWorkflow, RuleEngine, WorkflowAdminService,
};
use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::{OrgId, ProjectId, Task, TaskId, TaskTypeId, UserId};
use crate::pool::ports::store::{StoreError, TaskStore};
use chrono::Utc;
use mockall::mock;
use rstest::{fixture, rstest};

struct Harness {
    store: InMemoryStore,
    admin: WorkflowAdminService<InMemoryWorkflowRepository, mockable::DefaultClock>,
    org_id: OrgId,
    project_id: ProjectId,
}

#[fixture]
fn harness() -> Harness {
    let store = InMemoryStore::new();
    let admin = WorkflowAdminService::new(
        Arc::new(InMemoryWorkflowRepository::new(store.clone())),
        Arc::new(mockable::DefaultClock),
    );
    Harness {
        store,
        admin,
        org_id: OrgId::new(),
        project_id: ProjectId::new(),
    }
}

impl Harness {
    async fn seed_workflow(&self, project_scoped: bool, name: &str) -> crate::automation::domain::Workflow {
        self.admin
            .create_workflow(CreateWorkflow {
                org_id: self.org_id,
                project_id: project_scoped.then_some(self.project_id),
                name: name.to_owned(),
            })
            .await
            .expect("workflow creation should succeed")
    }

    async fn seed_rule_with_template(
        &self,
        workflow: &crate::automation::domain::Workflow,
        template_name: &str,
    ) -> Rule {
        let rule = self
            .admin
            .add_rule(AddRule {
                workflow_id: workflow.id(),
                resource_type: "task".to_owned(),
                to_state: "completed".to_owned(),
                task_type_id: None,
            })
            .await
            .expect("rule creation should succeed");
        let template = self
            .admin
            .create_template(CreateTemplate {
                org_id: self.org_id,
                name: template_name.to_owned(),
                type_id: TaskTypeId::new(),
                priority: 2,
                description: None,
            })
            .await
            .expect("template creation should succeed");
        self.admin
            .attach_template(rule.id(), template.id(), 0)
            .await
            .expect("template attachment should succeed");
        rule
    }

    fn completed_event(&self, user: Option<UserId>) -> StateChangeEvent {
        let mut event = StateChangeEvent::new(
            OriginRef::Task(TaskId::new()),
            TriggerState::Task(TaskTrigger::Completed),
            self.org_id,
            self.project_id,
        )
        .with_task_type(TaskTypeId::new());
        if let Some(user_id) = user {
            event = event.with_triggering_user(user_id);
        }
        event
    }

    async fn evaluate(&self, event: StateChangeEvent) -> Vec<RuleExecution> {
        let engine = RuleEngine::new();
        let now = Utc::now();
        self.store
            .with_transaction(move |tx| -> Result<Vec<RuleExecution>, StoreError> {
                engine.evaluate(tx, &event, now)
            })
            .await
            .expect("evaluation should run")
    }

    fn spawned_count(&self, title: &str) -> usize {
        let state = self.store.lock().expect("state lock");
        state
            .tasks
            .values()
            .filter(|task| task.title().as_str() == title)
            .count()
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn applied_rule_spawns_template_tasks(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Completions").await;
    let rule = harness.seed_rule_with_template(&workflow, "Write changelog").await;
    let user = UserId::new();

    let executions = harness.evaluate(harness.completed_event(Some(user))).await;

    assert_eq!(executions.len(), 1);
    let execution = executions.first().expect("one execution");
    assert_eq!(execution.rule_id(), rule.id());
    assert_eq!(execution.outcome(), ExecutionOutcome::Applied);
    assert_eq!(execution.triggered_by(), Some(user));
    assert_eq!(harness.spawned_count("Write changelog"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inactive_workflow_suppresses_with_ledger_row(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Paused automation").await;
    harness.seed_rule_with_template(&workflow, "Unreachable").await;
    harness
        .admin
        .deactivate_workflow(workflow.id())
        .await
        .expect("deactivation should succeed");

    let executions = harness
        .evaluate(harness.completed_event(Some(UserId::new())))
        .await;

    assert_eq!(executions.len(), 1);
    assert_eq!(
        executions.first().expect("one execution").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::Inactive)
    );
    assert_eq!(harness.spawned_count("Unreachable"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inactive_rule_suppresses_with_ledger_row(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Partially paused").await;
    let rule = harness.seed_rule_with_template(&workflow, "Unreachable").await;
    harness
        .admin
        .set_rule_active(rule.id(), false)
        .await
        .expect("rule deactivation should succeed");

    let executions = harness
        .evaluate(harness.completed_event(Some(UserId::new())))
        .await;

    assert_eq!(
        executions.first().expect("one execution").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::Inactive)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn system_events_suppress_as_not_user_triggered(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Completions").await;
    harness.seed_rule_with_template(&workflow, "Unreachable").await;

    let executions = harness.evaluate(harness.completed_event(None)).await;

    assert_eq!(
        executions.first().expect("one execution").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::NotUserTriggered)
    );
    assert_eq!(harness.spawned_count("Unreachable"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_type_filter_mismatch_suppresses_as_not_matching(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Typed completions").await;
    let rule = harness
        .admin
        .add_rule(AddRule {
            workflow_id: workflow.id(),
            resource_type: "task".to_owned(),
            to_state: "completed".to_owned(),
            task_type_id: Some(TaskTypeId::new()),
        })
        .await
        .expect("rule creation should succeed");

    let executions = harness
        .evaluate(harness.completed_event(Some(UserId::new())))
        .await;

    assert_eq!(executions.first().expect("one execution").rule_id(), rule.id());
    assert_eq!(
        executions.first().expect("one execution").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::NotMatching)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_evaluation_of_same_origin_is_idempotent(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Completions").await;
    harness.seed_rule_with_template(&workflow, "Write changelog").await;
    let event = harness.completed_event(Some(UserId::new()));

    let first = harness.evaluate(event).await;
    let second = harness.evaluate(event).await;

    assert_eq!(
        first.first().expect("one execution").outcome(),
        ExecutionOutcome::Applied
    );
    assert_eq!(
        second.first().expect("one execution").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::Idempotent)
    );
    assert_eq!(harness.spawned_count("Write changelog"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn broken_template_suppresses_one_rule_and_evaluation_continues(harness: Harness) {
    let workflow = harness.seed_workflow(true, "Mixed health").await;
    let broken = harness
        .admin
        .add_rule(AddRule {
            workflow_id: workflow.id(),
            resource_type: "task".to_owned(),
            to_state: "completed".to_owned(),
            task_type_id: None,
        })
        .await
        .expect("rule creation should succeed");
    {
        // Bind a template id that resolves to nothing.
        let mut state = harness.store.lock().expect("state lock");
        state
            .rules
            .get_mut(&broken.id())
            .expect("rule should exist")
            .attach_template(TemplateBinding::new(TemplateId::new(), 0));
    }
    let healthy = harness.seed_rule_with_template(&workflow, "Write changelog").await;

    let executions = harness
        .evaluate(harness.completed_event(Some(UserId::new())))
        .await;

    assert_eq!(executions.len(), 2);
    let outcomes: Vec<_> = executions
        .iter()
        .map(|execution| (execution.rule_id(), execution.outcome()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (
                broken.id(),
                ExecutionOutcome::Suppressed(SuppressionReason::TemplateError)
            ),
            (healthy.id(), ExecutionOutcome::Applied),
        ]
    );
    assert_eq!(harness.spawned_count("Write changelog"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn project_scoped_rules_evaluate_before_org_wide(harness: Harness) {
    // Seed the org-wide workflow first so creation order alone would put
    // it ahead; scope precedence must still win.
    let org_wide = harness.seed_workflow(false, "Org defaults").await;
    let org_rule = harness.seed_rule_with_template(&org_wide, "Org follow-up").await;
    let scoped = harness.seed_workflow(true, "Project overrides").await;
    let project_rule = harness
        .seed_rule_with_template(&scoped, "Project follow-up")
        .await;

    let executions = harness
        .evaluate(harness.completed_event(Some(UserId::new())))
        .await;

    let order: Vec<_> = executions.iter().map(RuleExecution::rule_id).collect();
    assert_eq!(order, vec![project_rule.id(), org_rule.id()]);
    assert_eq!(harness.spawned_count("Project follow-up"), 1);
    assert_eq!(harness.spawned_count("Org follow-up"), 1);
}

mock! {
    EvalStore {}

    impl EvaluationStore for EvalStore {
        fn candidate_rules(
            &mut self,
            event: &StateChangeEvent,
        ) -> Result<Vec<CandidateRule>, StoreError>;
        fn load_template(&mut self, id: TemplateId) -> Result<Option<TaskTemplate>, StoreError>;
        fn has_applied_execution(
            &mut self,
            rule_id: RuleId,
            origin: OriginRef,
        ) -> Result<bool, StoreError>;
        fn insert_spawned_task(&mut self, task: &Task) -> Result<(), StoreError>;
        fn append_execution(&mut self, execution: &RuleExecution) -> Result<(), StoreError>;
    }
}

#[rstest]
fn store_failures_abort_evaluation() {
    let mut store = MockEvalStore::new();
    store
        .expect_candidate_rules()
        .returning(|_| Err(StoreError::persistence(std::io::Error::other("down"))));

    let engine = RuleEngine::new();
    let event = StateChangeEvent::new(
        OriginRef::Task(TaskId::new()),
        TriggerState::Task(TaskTrigger::Completed),
        OrgId::new(),
        ProjectId::new(),
    )
    .with_triggering_user(UserId::new());

    let result = engine.evaluate(&mut store, &event, Utc::now());

    assert!(result.is_err());
}
