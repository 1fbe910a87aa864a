//! Unit tests for derived card and milestone state.

use crate::pool::domain::{CardState, MilestoneProgress, MilestoneState, TaskCounts};
use rstest::rstest;

#[rstest]
#[case(TaskCounts::new(0, 0, 0), CardState::Pendiente)]
#[case(TaskCounts::new(3, 1, 2), CardState::EnCurso)]
#[case(TaskCounts::new(2, 2, 0), CardState::Cerrada)]
#[case(TaskCounts::new(3, 0, 3), CardState::Pendiente)]
#[case(TaskCounts::new(3, 0, 2), CardState::EnCurso)]
#[case(TaskCounts::new(1, 0, 0), CardState::EnCurso)]
#[case(TaskCounts::new(1, 1, 0), CardState::Cerrada)]
fn card_state_derivation_is_total(#[case] counts: TaskCounts, #[case] expected: CardState) {
    assert_eq!(CardState::derive(counts), expected);
}

#[rstest]
fn milestone_progress_folds_per_card_counts() {
    let progress = MilestoneProgress::from_card_counts(vec![
        TaskCounts::new(2, 2, 0),
        TaskCounts::new(3, 1, 1),
    ]);

    assert_eq!(progress.cards_total, 2);
    assert_eq!(progress.cards_completed, 1);
    assert_eq!(progress.tasks_total, 5);
    assert_eq!(progress.tasks_completed, 3);
    assert_eq!(progress.tasks_available, 1);
    assert!(!progress.is_completed());
}

#[rstest]
fn empty_milestone_is_not_completed() {
    let progress = MilestoneProgress::from_card_counts(Vec::new());
    assert!(!progress.is_completed());
    assert_eq!(MilestoneState::derive(&progress), MilestoneState::Ready);
}

#[rstest]
fn milestone_completes_when_all_cards_and_tasks_complete() {
    let progress = MilestoneProgress::from_card_counts(vec![
        TaskCounts::new(2, 2, 0),
        TaskCounts::new(1, 1, 0),
    ]);
    assert!(progress.is_completed());
    assert_eq!(MilestoneState::derive(&progress), MilestoneState::Completed);
}

#[rstest]
fn milestone_activates_once_work_leaves_the_pool() {
    let untouched = MilestoneProgress::from_card_counts(vec![TaskCounts::new(2, 0, 2)]);
    assert_eq!(MilestoneState::derive(&untouched), MilestoneState::Ready);

    let started = MilestoneProgress::from_card_counts(vec![TaskCounts::new(2, 0, 1)]);
    assert_eq!(MilestoneState::derive(&started), MilestoneState::Active);
}

#[rstest]
fn card_state_parsing_round_trips() {
    for state in [CardState::Pendiente, CardState::EnCurso, CardState::Cerrada] {
        assert_eq!(CardState::try_from(state.as_str()), Ok(state));
    }
    assert!(CardState::try_from("archived").is_err());
}
