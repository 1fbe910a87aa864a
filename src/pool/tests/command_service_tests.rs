//! Coordinator tests: optimistic concurrency, rule side effects, and the
//! derived-state cascade, all through the in-memory transactional store.

use std::sync::Arc;

use crate::automation::adapters::memory::InMemoryWorkflowRepository;
use crate::automation::domain::{ExecutionOutcome, RuleId, SuppressionReason};
use crate::automation::services::{
    AddRule, CreateTemplate, CreateWorkflow, RuleEngine, WorkflowAdminService,
};
use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::{
    Actor, CardId, ClaimMode, OrgId, ProjectId, Role, TaskState, TaskTypeId, UserId, Version,
};
use crate::pool::services::{
    BoardService, CreateCard, CreateMilestone, CreateTask, DeleteTask, MutateTask,
    TaskCommandError, TaskCommandService, TaskOperation,
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

struct Harness {
    store: InMemoryStore,
    commands: TaskCommandService<InMemoryStore, DefaultClock>,
    board: BoardService<InMemoryStore, DefaultClock>,
    admin: WorkflowAdminService<InMemoryWorkflowRepository, DefaultClock>,
    org_id: OrgId,
    project_id: ProjectId,
}

#[fixture]
fn harness() -> Harness {
    let store = InMemoryStore::new();
    let clock = Arc::new(DefaultClock);
    let workflows = Arc::new(InMemoryWorkflowRepository::new(store.clone()));
    Harness {
        commands: TaskCommandService::new(
            Arc::new(store.clone()),
            RuleEngine::new(),
            Arc::clone(&clock),
        ),
        board: BoardService::new(Arc::new(store.clone()), Arc::clone(&clock)),
        admin: WorkflowAdminService::new(workflows, clock),
        store,
        org_id: OrgId::new(),
        project_id: ProjectId::new(),
    }
}

fn member() -> Actor {
    Actor::new(UserId::new(), Role::Member)
}

fn admin() -> Actor {
    Actor::new(UserId::new(), Role::Admin)
}

impl Harness {
    fn create_request(&self, actor: Actor, card_id: Option<CardId>) -> CreateTask {
        CreateTask {
            org_id: self.org_id,
            project_id: self.project_id,
            type_id: TaskTypeId::new(),
            card_id,
            title: "Prepare release notes".to_owned(),
            description: None,
            priority: 3,
            actor,
        }
    }

    /// Seeds an active project-scoped workflow with one rule and one
    /// attached template, returning the rule identifier.
    async fn seed_rule(&self, resource_type: &str, to_state: &str, template_name: &str) -> RuleId {
        let workflow = self
            .admin
            .create_workflow(CreateWorkflow {
                org_id: self.org_id,
                project_id: Some(self.project_id),
                name: "Follow-up automation".to_owned(),
            })
            .await
            .expect("workflow creation should succeed");
        let rule = self
            .admin
            .add_rule(AddRule {
                workflow_id: workflow.id(),
                resource_type: resource_type.to_owned(),
                to_state: to_state.to_owned(),
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
        rule.id()
    }

    fn tasks_titled(&self, title: &str) -> usize {
        let state = self.store.lock().expect("state lock");
        state
            .tasks
            .values()
            .filter(|task| task.title().as_str() == title)
            .count()
    }

    fn executions_for(&self, rule_id: RuleId) -> Vec<ExecutionOutcome> {
        let state = self.store.lock().expect("state lock");
        state
            .executions
            .iter()
            .filter(|execution| execution.rule_id() == rule_id)
            .map(|execution| execution.outcome())
            .collect()
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_stores_available_task_at_version_one(harness: Harness) {
    let task = harness
        .commands
        .create(harness.create_request(member(), None))
        .await
        .expect("creation should succeed");

    assert_eq!(task.state(), &TaskState::Available);
    assert_eq!(task.version(), Version::INITIAL);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claim_sets_claimant_and_bumps_version(harness: Harness) {
    let actor = member();
    let task = harness
        .commands
        .create(harness.create_request(actor, None))
        .await
        .expect("creation should succeed");

    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("claim should succeed");

    assert!(matches!(
        claimed.state(),
        TaskState::Claimed {
            claimed_by,
            mode: ClaimMode::Taken,
            ..
        } if *claimed_by == actor.user_id()
    ));
    assert_eq!(claimed.version().value(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_version_claim_loses_first_write_wins(harness: Harness) {
    let first = member();
    let second = member();
    let task = harness
        .commands
        .create(harness.create_request(first, None))
        .await
        .expect("creation should succeed");

    harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: first,
            expected_version: Version::INITIAL,
            operation: TaskOperation::Claim,
        })
        .await
        .expect("first claim should succeed");

    let result = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: second,
            expected_version: Version::INITIAL,
            operation: TaskOperation::Claim,
        })
        .await;

    let Err(TaskCommandError::ConflictVersion { expected, actual }) = result else {
        panic!("stale claim should report a version conflict");
    };
    assert_eq!(expected.value(), 1);
    assert_eq!(actual.value(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fresh_version_claim_on_claimed_task_conflicts(harness: Harness) {
    let first = member();
    let task = harness
        .commands
        .create(harness.create_request(first, None))
        .await
        .expect("creation should succeed");
    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: first,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("first claim should succeed");

    let result = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: member(),
            expected_version: claimed.version(),
            operation: TaskOperation::Claim,
        })
        .await;

    assert!(matches!(result, Err(TaskCommandError::ConflictClaimed)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn release_by_non_claimant_is_forbidden_and_leaves_task_unchanged(harness: Harness) {
    let claimant = member();
    let task = harness
        .commands
        .create(harness.create_request(claimant, None))
        .await
        .expect("creation should succeed");
    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: claimant,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("claim should succeed");

    let result = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor: member(),
            expected_version: claimed.version(),
            operation: TaskOperation::Release,
        })
        .await;

    assert!(matches!(result, Err(TaskCommandError::Forbidden)));
    let stored = harness
        .store
        .lock()
        .expect("state lock")
        .tasks
        .get(&task.id())
        .cloned()
        .expect("task should still exist");
    assert_eq!(stored.version(), claimed.version());
    assert_eq!(stored.state(), claimed.state());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_applies_matching_rule_in_same_transaction(harness: Harness) {
    let rule_id = harness.seed_rule("task", "completed", "Follow-up").await;
    let actor = member();
    let task = harness
        .commands
        .create(harness.create_request(actor, None))
        .await
        .expect("creation should succeed");
    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("claim should succeed");

    let completed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: claimed.version(),
            operation: TaskOperation::Complete,
        })
        .await
        .expect("completion should succeed");

    assert_eq!(completed.version().value(), 3);
    assert_eq!(harness.tasks_titled("Follow-up"), 1);
    assert_eq!(
        harness.executions_for(rule_id),
        vec![ExecutionOutcome::Applied]
    );

    let spawned = {
        let state = harness.store.lock().expect("state lock");
        state
            .tasks
            .values()
            .find(|candidate| candidate.title().as_str() == "Follow-up")
            .cloned()
            .expect("spawned task should exist")
    };
    assert_eq!(spawned.state(), &TaskState::Available);
    assert_eq!(spawned.version(), Version::INITIAL);
    assert_eq!(spawned.created_by(), actor.user_id());
    assert_eq!(spawned.project_id(), harness.project_id);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_applies_at_most_once_per_origin(harness: Harness) {
    let rule_id = harness.seed_rule("task", "taken", "Pair review").await;
    let actor = member();
    let task = harness
        .commands
        .create(harness.create_request(actor, None))
        .await
        .expect("creation should succeed");

    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("first claim should succeed");
    let released = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: claimed.version(),
            operation: TaskOperation::Release,
        })
        .await
        .expect("release should succeed");
    harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: released.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("second claim should succeed");

    assert_eq!(harness.tasks_titled("Pair review"), 1);
    assert_eq!(
        harness.executions_for(rule_id),
        vec![
            ExecutionOutcome::Applied,
            ExecutionOutcome::Suppressed(SuppressionReason::Idempotent),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_a_cards_last_task_fires_card_rule(harness: Harness) {
    let rule_id = harness.seed_rule("card", "cerrada", "Retrospective").await;
    let card = harness
        .board
        .create_card(CreateCard {
            org_id: harness.org_id,
            project_id: harness.project_id,
            milestone_id: None,
            title: "Release hardening".to_owned(),
            actor: admin(),
        })
        .await
        .expect("card creation should succeed");

    let actor = member();
    let task = harness
        .commands
        .create(harness.create_request(actor, Some(card.id())))
        .await
        .expect("creation should succeed");
    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("claim should succeed");
    harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: claimed.version(),
            operation: TaskOperation::Complete,
        })
        .await
        .expect("completion should succeed");

    assert_eq!(
        harness.executions_for(rule_id),
        vec![ExecutionOutcome::Applied]
    );
    assert_eq!(harness.tasks_titled("Retrospective"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn milestone_completion_cascades_from_its_last_task(harness: Harness) {
    let rule_id = harness.seed_rule("milestone", "completed", "Ship announcement").await;
    let milestone = harness
        .board
        .create_milestone(CreateMilestone {
            org_id: harness.org_id,
            project_id: harness.project_id,
            title: "Q3 launch".to_owned(),
            actor: admin(),
        })
        .await
        .expect("milestone creation should succeed");
    let card = harness
        .board
        .create_card(CreateCard {
            org_id: harness.org_id,
            project_id: harness.project_id,
            milestone_id: Some(milestone.id()),
            title: "Launch checklist".to_owned(),
            actor: admin(),
        })
        .await
        .expect("card creation should succeed");

    let actor = member();
    let task = harness
        .commands
        .create(harness.create_request(actor, Some(card.id())))
        .await
        .expect("creation should succeed");
    let claimed = harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: task.version(),
            operation: TaskOperation::Claim,
        })
        .await
        .expect("claim should succeed");
    harness
        .commands
        .mutate(MutateTask {
            task_id: task.id(),
            actor,
            expected_version: claimed.version(),
            operation: TaskOperation::Complete,
        })
        .await
        .expect("completion should succeed");

    assert_eq!(
        harness.executions_for(rule_id),
        vec![ExecutionOutcome::Applied]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_unknown_card(harness: Harness) {
    let result = harness
        .commands
        .create(harness.create_request(member(), Some(CardId::new())))
        .await;

    assert!(matches!(
        result,
        Err(TaskCommandError::Validation { field: "card_id", .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_requires_creator_or_claimant(harness: Harness) {
    let creator = member();
    let task = harness
        .commands
        .create(harness.create_request(creator, None))
        .await
        .expect("creation should succeed");

    let forbidden = harness
        .commands
        .delete(DeleteTask {
            task_id: task.id(),
            actor: member(),
            expected_version: task.version(),
        })
        .await;
    assert!(matches!(forbidden, Err(TaskCommandError::Forbidden)));

    harness
        .commands
        .delete(DeleteTask {
            task_id: task.id(),
            actor: creator,
            expected_version: task.version(),
        })
        .await
        .expect("creator delete should succeed");
    assert!(
        harness
            .store
            .lock()
            .expect("state lock")
            .tasks
            .get(&task.id())
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_requires_version_match(harness: Harness) {
    let creator = member();
    let task = harness
        .commands
        .create(harness.create_request(creator, None))
        .await
        .expect("creation should succeed");

    let result = harness
        .commands
        .delete(DeleteTask {
            task_id: task.id(),
            actor: creator,
            expected_version: task.version().next(),
        })
        .await;

    assert!(matches!(
        result,
        Err(TaskCommandError::ConflictVersion { .. })
    ));
}
