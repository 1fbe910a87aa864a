//! Unit tests for the task state machine and validated scalar types.

use crate::pool::domain::{
    ClaimMode, NewTaskData, OrgId, Priority, ProjectId, Task, TaskState, TaskTitle,
    TaskTransitionError, TaskTypeId, TaskValidationError, UserId, Version,
};
use chrono::Utc;
use rstest::{fixture, rstest};

fn new_task_data(created_by: UserId) -> NewTaskData {
    NewTaskData {
        org_id: OrgId::new(),
        project_id: ProjectId::new(),
        type_id: TaskTypeId::new(),
        card_id: None,
        title: TaskTitle::new("Review deployment checklist").expect("valid title"),
        description: None,
        priority: Priority::new(3).expect("valid priority"),
        created_by,
    }
}

#[fixture]
fn task() -> Task {
    Task::create(new_task_data(UserId::new()), Utc::now())
}

#[rstest]
fn create_starts_available_at_version_one(task: Task) {
    assert_eq!(task.state(), &TaskState::Available);
    assert_eq!(task.version(), Version::INITIAL);
}

#[rstest]
fn claim_transitions_to_taken_and_bumps_version(mut task: Task) {
    let actor = UserId::new();
    let now = Utc::now();

    task.claim(actor, now).expect("claim should succeed");

    assert_eq!(
        task.state(),
        &TaskState::Claimed {
            claimed_by: actor,
            claimed_at: now,
            mode: ClaimMode::Taken,
        }
    );
    assert_eq!(task.version().value(), 2);
}

#[rstest]
fn claim_rejects_already_claimed_task(mut task: Task) {
    let first = UserId::new();
    task.claim(first, Utc::now()).expect("first claim succeeds");

    let result = task.claim(UserId::new(), Utc::now());

    assert_eq!(
        result,
        Err(TaskTransitionError::AlreadyClaimed { claimed_by: first })
    );
    assert_eq!(task.version().value(), 2);
}

#[rstest]
fn claim_rejects_completed_task(mut task: Task) {
    let actor = UserId::new();
    task.claim(actor, Utc::now()).expect("claim succeeds");
    task.complete(actor, Utc::now()).expect("complete succeeds");

    let result = task.claim(UserId::new(), Utc::now());

    assert_eq!(result, Err(TaskTransitionError::Terminal));
}

#[rstest]
fn release_by_claimant_returns_task_to_pool(mut task: Task) {
    let actor = UserId::new();
    task.claim(actor, Utc::now()).expect("claim succeeds");

    task.release(actor).expect("release should succeed");

    assert_eq!(task.state(), &TaskState::Available);
    assert_eq!(task.version().value(), 3);
}

#[rstest]
fn release_by_other_user_is_rejected(mut task: Task) {
    let claimant = UserId::new();
    task.claim(claimant, Utc::now()).expect("claim succeeds");

    let result = task.release(UserId::new());

    assert_eq!(
        result,
        Err(TaskTransitionError::NotClaimant {
            claimed_by: claimant
        })
    );
    assert_eq!(task.version().value(), 2);
}

#[rstest]
fn release_of_available_task_is_rejected(mut task: Task) {
    let result = task.release(UserId::new());
    assert_eq!(result, Err(TaskTransitionError::NotClaimed));
}

#[rstest]
fn complete_is_terminal(mut task: Task) {
    let actor = UserId::new();
    let finished = Utc::now();
    task.claim(actor, Utc::now()).expect("claim succeeds");
    task.complete(actor, finished).expect("complete succeeds");

    assert_eq!(
        task.state(),
        &TaskState::Completed {
            completed_at: finished
        }
    );
    assert_eq!(task.release(actor), Err(TaskTransitionError::Terminal));
    assert_eq!(
        task.complete(actor, Utc::now()),
        Err(TaskTransitionError::Terminal)
    );
}

#[rstest]
fn work_session_toggles_mode_within_claim(mut task: Task) {
    let actor = UserId::new();
    task.claim(actor, Utc::now()).expect("claim succeeds");

    task.start_work(actor).expect("start should succeed");
    assert!(matches!(
        task.state(),
        TaskState::Claimed {
            mode: ClaimMode::Ongoing,
            ..
        }
    ));
    assert_eq!(task.version().value(), 3);

    task.pause_work(actor).expect("pause should succeed");
    assert!(matches!(
        task.state(),
        TaskState::Claimed {
            mode: ClaimMode::Taken,
            ..
        }
    ));
    assert_eq!(task.version().value(), 4);
}

#[rstest]
fn work_session_guards_reject_double_toggle(mut task: Task) {
    let actor = UserId::new();
    task.claim(actor, Utc::now()).expect("claim succeeds");

    assert_eq!(
        task.pause_work(actor),
        Err(TaskTransitionError::WorkSessionIdle)
    );
    task.start_work(actor).expect("start succeeds");
    assert_eq!(
        task.start_work(actor),
        Err(TaskTransitionError::WorkSessionActive)
    );
}

#[rstest]
fn version_increases_by_one_per_mutation(mut task: Task) {
    let actor = UserId::new();
    let mut expected = 1;
    assert_eq!(task.version().value(), expected);

    for _ in 0..3 {
        task.claim(actor, Utc::now()).expect("claim succeeds");
        expected += 1;
        assert_eq!(task.version().value(), expected);
        task.release(actor).expect("release succeeds");
        expected += 1;
        assert_eq!(task.version().value(), expected);
    }
}

#[rstest]
fn creator_and_claimant_may_delete() {
    let creator = UserId::new();
    let mut task = Task::create(new_task_data(creator), Utc::now());
    let stranger = UserId::new();
    assert!(task.deletable_by(creator));
    assert!(!task.deletable_by(stranger));

    let claimant = UserId::new();
    task.claim(claimant, Utc::now()).expect("claim succeeds");
    assert!(task.deletable_by(claimant));
    assert!(task.deletable_by(creator));
    assert!(!task.deletable_by(stranger));
}

#[rstest]
#[case(0)]
#[case(6)]
#[case(-1)]
fn priority_rejects_out_of_range_values(#[case] value: i16) {
    assert_eq!(
        Priority::new(value),
        Err(TaskValidationError::InvalidPriority(value))
    );
}

#[rstest]
fn title_rejects_whitespace_only_values() {
    assert_eq!(TaskTitle::new("   "), Err(TaskValidationError::EmptyTitle));
}

#[rstest]
fn title_trims_surrounding_whitespace() {
    let title = TaskTitle::new("  Fix flaky test  ").expect("valid title");
    assert_eq!(title.as_str(), "Fix flaky test");
}

#[rstest]
fn version_round_trips_through_persistence() {
    let version = Version::from_persisted(7).expect("valid version");
    assert_eq!(version.value(), 7);
    assert_eq!(version.next().value(), 8);
    assert!(Version::from_persisted(0).is_err());
}
