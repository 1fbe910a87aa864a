//! Unit tests for triggers, events, outcomes, and metrics value types.

use crate::automation::domain::{
    DateRange, DateRangeError, OriginRef, ResourceType, RuleTrigger, StateChangeEvent,
    SuppressionReason, TaskTrigger, TriggerParseError, TriggerState,
};
use crate::automation::domain::{ExecutionOutcome, RuleTally};
use crate::pool::domain::{
    CardState, ClaimMode, MilestoneState, OrgId, ProjectId, TaskId, TaskState, TaskTypeId, UserId,
};
use chrono::{Duration, Utc};
use rstest::rstest;

#[rstest]
#[case("task", "completed", TriggerState::Task(TaskTrigger::Completed))]
#[case("task", "ongoing", TriggerState::Task(TaskTrigger::Ongoing))]
#[case("card", "cerrada", TriggerState::Card(CardState::Cerrada))]
#[case("card", "en_curso", TriggerState::Card(CardState::EnCurso))]
#[case("milestone", "completed", TriggerState::Milestone(MilestoneState::Completed))]
#[case("TASK", " Completed ", TriggerState::Task(TaskTrigger::Completed))]
fn trigger_parsing_accepts_known_pairs(
    #[case] resource_type: &str,
    #[case] to_state: &str,
    #[case] expected: TriggerState,
) {
    assert_eq!(
        TriggerState::parse(resource_type, to_state),
        Ok(expected)
    );
}

#[rstest]
fn trigger_parsing_rejects_unknown_resource_type() {
    let result = TriggerState::parse("sprint", "completed");
    assert!(matches!(
        result,
        Err(TriggerParseError::UnknownResourceType(_))
    ));
}

#[rstest]
#[case("task", "cerrada")]
#[case("card", "ongoing")]
#[case("milestone", "pendiente")]
fn trigger_parsing_rejects_state_from_wrong_resource(
    #[case] resource_type: &str,
    #[case] to_state: &str,
) {
    assert!(matches!(
        TriggerState::parse(resource_type, to_state),
        Err(TriggerParseError::UnknownState { .. })
    ));
}

#[rstest]
fn task_trigger_flattens_claim_mode() {
    let claimant = UserId::new();
    let claimed_taken = TaskState::Claimed {
        claimed_by: claimant,
        claimed_at: Utc::now(),
        mode: ClaimMode::Taken,
    };
    let claimed_ongoing = TaskState::Claimed {
        claimed_by: claimant,
        claimed_at: Utc::now(),
        mode: ClaimMode::Ongoing,
    };

    assert_eq!(
        TaskTrigger::from_task_state(&TaskState::Available),
        TaskTrigger::Available
    );
    assert_eq!(TaskTrigger::from_task_state(&claimed_taken), TaskTrigger::Taken);
    assert_eq!(
        TaskTrigger::from_task_state(&claimed_ongoing),
        TaskTrigger::Ongoing
    );
}

fn completed_task_event(task_type: Option<TaskTypeId>) -> StateChangeEvent {
    let mut event = StateChangeEvent::new(
        OriginRef::Task(TaskId::new()),
        TriggerState::Task(TaskTrigger::Completed),
        OrgId::new(),
        ProjectId::new(),
    )
    .with_triggering_user(UserId::new());
    if let Some(value) = task_type {
        event = event.with_task_type(value);
    }
    event
}

#[rstest]
fn rule_trigger_without_filter_matches_any_task_type(#[values(true, false)] typed: bool) {
    let trigger = RuleTrigger::new(TriggerState::Task(TaskTrigger::Completed));
    let event = completed_task_event(typed.then(TaskTypeId::new));
    assert!(trigger.matches(&event));
}

#[rstest]
fn rule_trigger_task_type_filter_must_match() {
    let wanted = TaskTypeId::new();
    let trigger =
        RuleTrigger::new(TriggerState::Task(TaskTrigger::Completed)).with_task_type(wanted);

    assert!(trigger.matches(&completed_task_event(Some(wanted))));
    assert!(!trigger.matches(&completed_task_event(Some(TaskTypeId::new()))));
    assert!(!trigger.matches(&completed_task_event(None)));
}

#[rstest]
fn origin_ref_exposes_resource_type() {
    let origin = OriginRef::Task(TaskId::new());
    assert_eq!(origin.resource_type(), ResourceType::Task);
}

#[rstest]
fn suppression_reasons_round_trip_through_storage_form() {
    for reason in [
        SuppressionReason::Inactive,
        SuppressionReason::NotUserTriggered,
        SuppressionReason::NotMatching,
        SuppressionReason::Idempotent,
        SuppressionReason::TemplateError,
    ] {
        assert_eq!(SuppressionReason::try_from(reason.as_str()), Ok(reason));
    }
    assert!(SuppressionReason::try_from("rate_limited").is_err());
}

#[rstest]
fn date_range_rejects_inverted_bounds() {
    let now = Utc::now();
    let result = DateRange::new(now, now - Duration::hours(1));
    assert!(matches!(result, Err(DateRangeError::Inverted { .. })));
}

#[rstest]
fn date_range_rejects_windows_beyond_ninety_days() {
    let now = Utc::now();
    let result = DateRange::new(now - Duration::days(91), now);
    assert!(matches!(
        result,
        Err(DateRangeError::WindowTooWide { days: 91, max: 90 })
    ));
}

#[rstest]
fn date_range_accepts_the_cap_exactly() {
    let now = Utc::now();
    let range = DateRange::new(now - Duration::days(90), now).expect("cap should be accepted");
    assert!(range.contains(now));
    assert!(!range.contains(now + Duration::seconds(1)));
}

#[rstest]
fn tally_records_outcomes_with_breakdown() {
    let mut tally = RuleTally::default();
    tally.record(ExecutionOutcome::Applied);
    tally.record(ExecutionOutcome::Suppressed(SuppressionReason::Idempotent));
    tally.record(ExecutionOutcome::Suppressed(SuppressionReason::Idempotent));
    tally.record(ExecutionOutcome::Suppressed(SuppressionReason::Inactive));

    assert_eq!(tally.evaluated, 4);
    assert_eq!(tally.applied, 1);
    assert_eq!(tally.suppressed, 3);
    assert_eq!(tally.breakdown.get(&SuppressionReason::Idempotent), Some(&2));
    assert_eq!(tally.breakdown.get(&SuppressionReason::Inactive), Some(&1));

    let mut merged = RuleTally::default();
    merged.merge(&tally);
    merged.merge(&tally);
    assert_eq!(merged.evaluated, 8);
    assert_eq!(merged.breakdown.get(&SuppressionReason::Idempotent), Some(&4));
}
