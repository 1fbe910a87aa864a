//! Metrics service tests: window defaults, range validation, and tally
//! aggregation over the ledger.

use std::sync::Arc;

use crate::automation::adapters::memory::{InMemoryExecutionLedger, InMemoryWorkflowRepository};
use crate::automation::domain::{
    ExecutionOutcome, OriginRef, Page, Rule, RuleExecution, RuleId, SuppressionReason,
};
use crate::automation::services::{
    AddRule, CreateWorkflow, MetricsError, MetricsWindow, RuleMetricsService, WorkflowAdminService,
};
use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::{OrgId, ProjectId, TaskId, UserId};
use chrono::{Duration, Utc};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

struct Harness {
    store: InMemoryStore,
    admin: WorkflowAdminService<InMemoryWorkflowRepository, DefaultClock>,
    metrics:
        RuleMetricsService<InMemoryWorkflowRepository, InMemoryExecutionLedger, DefaultClock>,
    org_id: OrgId,
}

#[fixture]
fn harness() -> Harness {
    let store = InMemoryStore::new();
    let repository = Arc::new(InMemoryWorkflowRepository::new(store.clone()));
    let ledger = Arc::new(InMemoryExecutionLedger::new(store.clone()));
    let clock = Arc::new(DefaultClock);
    Harness {
        admin: WorkflowAdminService::new(Arc::clone(&repository), Arc::clone(&clock)),
        metrics: RuleMetricsService::new(repository, ledger, clock),
        store,
        org_id: OrgId::new(),
    }
}

impl Harness {
    async fn seed_rule(&self) -> Rule {
        let workflow = self
            .admin
            .create_workflow(CreateWorkflow {
                org_id: self.org_id,
                project_id: Some(ProjectId::new()),
                name: "Metrics source".to_owned(),
            })
            .await
            .expect("workflow creation should succeed");
        self.admin
            .add_rule(AddRule {
                workflow_id: workflow.id(),
                resource_type: "task".to_owned(),
                to_state: "completed".to_owned(),
                task_type_id: None,
            })
            .await
            .expect("rule creation should succeed")
    }

    /// Appends ledger rows directly; the write path itself is covered by
    /// the engine tests.
    fn record(&self, rule_id: RuleId, outcome: ExecutionOutcome, days_ago: i64) {
        let mut state = self.store.lock().expect("state lock");
        state.executions.push(RuleExecution::record(
            rule_id,
            OriginRef::Task(TaskId::new()),
            outcome,
            Some(UserId::new()),
            Utc::now() - Duration::days(days_ago),
        ));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_rule_is_rejected(harness: Harness) {
    let result = harness
        .metrics
        .rule_metrics(RuleId::new(), MetricsWindow::default())
        .await;
    assert!(matches!(result, Err(MetricsError::RuleNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inverted_window_is_a_validation_error(harness: Harness) {
    let rule = harness.seed_rule().await;
    let now = Utc::now();

    let result = harness
        .metrics
        .rule_metrics(
            rule.id(),
            MetricsWindow {
                from: Some(now),
                to: Some(now - Duration::days(1)),
            },
        )
        .await;

    assert!(matches!(result, Err(MetricsError::Validation(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn window_wider_than_ninety_days_is_rejected(harness: Harness) {
    let rule = harness.seed_rule().await;
    let now = Utc::now();

    let result = harness
        .metrics
        .rule_metrics(
            rule.id(),
            MetricsWindow {
                from: Some(now - Duration::days(120)),
                to: Some(now),
            },
        )
        .await;

    assert!(matches!(result, Err(MetricsError::Validation(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn default_window_covers_the_last_thirty_days(harness: Harness) {
    let rule = harness.seed_rule().await;
    harness.record(rule.id(), ExecutionOutcome::Applied, 1);
    harness.record(
        rule.id(),
        ExecutionOutcome::Suppressed(SuppressionReason::Idempotent),
        10,
    );
    // Outside the default window; must not be counted.
    harness.record(rule.id(), ExecutionOutcome::Applied, 45);

    let metrics = harness
        .metrics
        .rule_metrics(rule.id(), MetricsWindow::default())
        .await
        .expect("metrics should load");

    assert_eq!(metrics.tally.evaluated, 2);
    assert_eq!(metrics.tally.applied, 1);
    assert_eq!(metrics.tally.suppressed, 1);
    assert_eq!(
        metrics.tally.breakdown.get(&SuppressionReason::Idempotent),
        Some(&1)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workflow_metrics_merge_per_rule_tallies(harness: Harness) {
    let workflow = harness
        .admin
        .create_workflow(CreateWorkflow {
            org_id: harness.org_id,
            project_id: Some(ProjectId::new()),
            name: "Two rules".to_owned(),
        })
        .await
        .expect("workflow creation should succeed");
    let request = |to_state: &str| AddRule {
        workflow_id: workflow.id(),
        resource_type: "task".to_owned(),
        to_state: to_state.to_owned(),
        task_type_id: None,
    };
    let first = harness.admin.add_rule(request("taken")).await.expect("first rule");
    let second = harness
        .admin
        .add_rule(request("completed"))
        .await
        .expect("second rule");

    harness.record(first.id(), ExecutionOutcome::Applied, 2);
    harness.record(
        second.id(),
        ExecutionOutcome::Suppressed(SuppressionReason::Inactive),
        3,
    );

    let metrics = harness
        .metrics
        .workflow_metrics(workflow.id(), MetricsWindow::default())
        .await
        .expect("metrics should load");

    assert_eq!(metrics.rules.len(), 2);
    assert_eq!(metrics.totals.evaluated, 2);
    assert_eq!(metrics.totals.applied, 1);
    assert_eq!(metrics.totals.suppressed, 1);
    let rule_order: Vec<RuleId> = metrics.rules.iter().map(|entry| entry.rule_id).collect();
    assert_eq!(rule_order, vec![first.id(), second.id()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn execution_listing_pages_newest_first(harness: Harness) {
    let rule = harness.seed_rule().await;
    harness.record(rule.id(), ExecutionOutcome::Applied, 3);
    harness.record(
        rule.id(),
        ExecutionOutcome::Suppressed(SuppressionReason::Idempotent),
        2,
    );
    harness.record(
        rule.id(),
        ExecutionOutcome::Suppressed(SuppressionReason::Idempotent),
        1,
    );

    let page = harness
        .metrics
        .executions(rule.id(), MetricsWindow::default(), Page::new(2, 1))
        .await
        .expect("listing should load");

    assert_eq!(page.len(), 2);
    assert_eq!(
        page.first().expect("row").outcome(),
        ExecutionOutcome::Suppressed(SuppressionReason::Idempotent)
    );
    assert_eq!(
        page.get(1).expect("row").outcome(),
        ExecutionOutcome::Applied
    );
}
