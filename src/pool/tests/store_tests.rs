//! Transactional semantics of the in-memory store: commit, rollback, and
//! guarded writes.

use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::{
    NewTaskData, OrgId, Priority, ProjectId, Task, TaskTitle, TaskTypeId, UserId, Version,
};
use crate::pool::ports::store::{MutationTransaction, StoreError, TaskStore, UpdateOutcome};
use chrono::Utc;
use eyre::eyre;
use rstest::{fixture, rstest};

fn sample_task() -> Task {
    Task::create(
        NewTaskData {
            org_id: OrgId::new(),
            project_id: ProjectId::new(),
            type_id: TaskTypeId::new(),
            card_id: None,
            title: TaskTitle::new("Wire up smoke tests").expect("valid title"),
            description: None,
            priority: Priority::new(4).expect("valid priority"),
            created_by: UserId::new(),
        },
        Utc::now(),
    )
}

#[fixture]
fn store() -> InMemoryStore {
    InMemoryStore::new()
}

#[derive(Debug, thiserror::Error)]
enum TestTxError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("injected failure")]
    Injected,
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn committed_transaction_persists_writes(store: InMemoryStore) {
    let task = sample_task();
    let task_id = task.id();

    store
        .with_transaction(move |tx| -> Result<(), StoreError> {
            tx.insert_task(&task)?;
            Ok(())
        })
        .await
        .expect("transaction should commit");

    let stored = store.lock().expect("state lock").tasks.get(&task_id).cloned();
    assert!(stored.is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_transaction_rolls_back_every_write(store: InMemoryStore) {
    let task = sample_task();
    let task_id = task.id();

    let result = store
        .with_transaction(move |tx| -> Result<(), TestTxError> {
            tx.insert_task(&task)?;
            Err(TestTxError::Injected)
        })
        .await;

    assert!(matches!(result, Err(TestTxError::Injected)));
    let stored = store.lock().expect("state lock").tasks.get(&task_id).cloned();
    assert!(stored.is_none(), "rolled-back insert must not be visible");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn guarded_update_reports_version_conflict_with_actual(store: InMemoryStore) -> eyre::Result<()> {
    let mut task = sample_task();
    let insert = task.clone();
    store
        .with_transaction(move |tx| -> Result<(), StoreError> {
            tx.insert_task(&insert)?;
            Ok(())
        })
        .await?;

    // Mutate off-version: the stored row is still at version 1.
    task.claim(UserId::new(), Utc::now())
        .map_err(|err| eyre!("claim should succeed: {err}"))?;
    let stale = task.clone();
    let outcome = store
        .with_transaction(move |tx| -> Result<UpdateOutcome, StoreError> {
            tx.update_task_guarded(&stale, Version::from_persisted(2).map_err(StoreError::persistence)?)
        })
        .await?;

    assert_eq!(
        outcome,
        UpdateOutcome::VersionConflict {
            actual: Version::INITIAL
        }
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn guarded_update_reports_missing_rows(store: InMemoryStore) {
    let task = sample_task();
    let outcome = store
        .with_transaction(move |tx| -> Result<UpdateOutcome, StoreError> {
            tx.update_task_guarded(&task, Version::INITIAL)
        })
        .await
        .expect("transaction should run");

    assert_eq!(outcome, UpdateOutcome::Missing);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn guarded_delete_removes_matching_version(store: InMemoryStore) {
    let task = sample_task();
    let task_id = task.id();
    store
        .with_transaction(move |tx| -> Result<(), StoreError> {
            tx.insert_task(&task)?;
            Ok(())
        })
        .await
        .expect("insert should commit");

    let outcome = store
        .with_transaction(move |tx| -> Result<UpdateOutcome, StoreError> {
            tx.delete_task_guarded(task_id, Version::INITIAL)
        })
        .await
        .expect("delete should run");

    assert_eq!(outcome, UpdateOutcome::Updated);
    assert!(
        store
            .lock()
            .expect("state lock")
            .tasks
            .get(&task_id)
            .is_none()
    );
}
