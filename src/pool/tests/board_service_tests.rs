//! Board service tests: role guards and derived-state reads.

use std::sync::Arc;

use crate::pool::adapters::memory::InMemoryStore;
use crate::pool::domain::{Actor, CardId, CardState, MilestoneId, OrgId, ProjectId, Role, UserId};
use crate::pool::services::{BoardError, BoardService, CreateCard, CreateMilestone};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type TestBoard = BoardService<InMemoryStore, DefaultClock>;

#[fixture]
fn board() -> TestBoard {
    BoardService::new(Arc::new(InMemoryStore::new()), Arc::new(DefaultClock))
}

fn card_request(actor: Actor) -> CreateCard {
    CreateCard {
        org_id: OrgId::new(),
        project_id: ProjectId::new(),
        milestone_id: None,
        title: "Onboarding flow".to_owned(),
        actor,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn card_creation_requires_admin_role(board: TestBoard) {
    let member = Actor::new(UserId::new(), Role::Member);
    let result = board.create_card(card_request(member)).await;
    assert!(matches!(result, Err(BoardError::Forbidden)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fresh_card_view_is_pendiente(board: TestBoard) {
    let admin = Actor::new(UserId::new(), Role::Admin);
    let card = board
        .create_card(card_request(admin))
        .await
        .expect("card creation should succeed");

    let view = board.card_view(card.id()).await.expect("view should load");

    assert_eq!(view.state, CardState::Pendiente);
    assert_eq!(view.counts.total, 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn card_view_rejects_unknown_card(board: TestBoard) {
    let result = board.card_view(CardId::new()).await;
    assert!(matches!(result, Err(BoardError::CardNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn card_rejects_dangling_milestone_reference(board: TestBoard) {
    let admin = Actor::new(UserId::new(), Role::Admin);
    let mut request = card_request(admin);
    request.milestone_id = Some(MilestoneId::new());

    let result = board.create_card(request).await;

    assert!(matches!(result, Err(BoardError::MilestoneNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn milestone_creation_requires_admin_role(board: TestBoard) {
    let member = Actor::new(UserId::new(), Role::Member);
    let result = board
        .create_milestone(CreateMilestone {
            org_id: OrgId::new(),
            project_id: ProjectId::new(),
            title: "Beta".to_owned(),
            actor: member,
        })
        .await;
    assert!(matches!(result, Err(BoardError::Forbidden)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_milestone_view_is_ready(board: TestBoard) {
    let admin = Actor::new(UserId::new(), Role::Admin);
    let milestone = board
        .create_milestone(CreateMilestone {
            org_id: OrgId::new(),
            project_id: ProjectId::new(),
            title: "Beta".to_owned(),
            actor: admin,
        })
        .await
        .expect("milestone creation should succeed");

    let view = board
        .milestone_view(milestone.id())
        .await
        .expect("view should load");

    assert_eq!(view.progress.cards_total, 0);
    assert!(!view.progress.is_completed());
}
