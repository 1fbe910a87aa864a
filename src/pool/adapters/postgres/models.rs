//! Diesel row models and conversions for pool persistence.

use super::schema::{cards, milestones, tasks};
use crate::pool::domain::{
    Card, CardId, ClaimMode, Milestone, MilestoneId, OrgId, PersistedCardData, PersistedTaskData,
    Priority, ProjectId, Task, TaskId, TaskState, TaskTitle, TaskTypeId, UserId, Version,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

/// Error raised when a persisted row violates a domain invariant.
#[derive(Debug, Clone, Error)]
#[error("corrupt {entity} row {id}: {detail}")]
pub(crate) struct CorruptRow {
    entity: &'static str,
    id: Uuid,
    detail: String,
}

impl CorruptRow {
    pub(crate) fn new(entity: &'static str, id: Uuid, detail: impl Into<String>) -> Self {
        Self {
            entity,
            id,
            detail: detail.into(),
        }
    }
}

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) type_id: Uuid,
    pub(crate) card_id: Option<Uuid>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) priority: i16,
    pub(crate) status: String,
    pub(crate) claimed_by: Option<Uuid>,
    pub(crate) claimed_at: Option<DateTime<Utc>>,
    pub(crate) claim_mode: Option<String>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) version: i64,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert/update model for task records.
///
/// `treat_none_as_null` matters: releasing a task must null out the
/// claimant columns, not leave them untouched.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct NewTaskRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) type_id: Uuid,
    pub(crate) card_id: Option<Uuid>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) priority: i16,
    pub(crate) status: String,
    pub(crate) claimed_by: Option<Uuid>,
    pub(crate) claimed_at: Option<DateTime<Utc>>,
    pub(crate) claim_mode: Option<String>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) version: i64,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

/// Query result row for card records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CardRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) milestone_id: Option<Uuid>,
    pub(crate) title: String,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for card records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cards)]
pub(crate) struct NewCardRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) milestone_id: Option<Uuid>,
    pub(crate) title: String,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

/// Query result row for milestone records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = milestones)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MilestoneRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) title: String,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insert model for milestone records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = milestones)]
pub(crate) struct NewMilestoneRow {
    pub(crate) id: Uuid,
    pub(crate) org_id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) title: String,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) fn task_to_row(task: &Task) -> NewTaskRow {
    let (claimed_by, claimed_at, claim_mode, completed_at) = match task.state() {
        TaskState::Available => (None, None, None, None),
        TaskState::Claimed {
            claimed_by,
            claimed_at,
            mode,
        } => (
            Some(claimed_by.into_inner()),
            Some(*claimed_at),
            Some(mode.as_str().to_owned()),
            None,
        ),
        TaskState::Completed { completed_at } => (None, None, None, Some(*completed_at)),
    };
    NewTaskRow {
        id: task.id().into_inner(),
        org_id: task.org_id().into_inner(),
        project_id: task.project_id().into_inner(),
        type_id: task.type_id().into_inner(),
        card_id: task.card_id().map(CardId::into_inner),
        title: task.title().as_str().to_owned(),
        description: task.description().map(ToOwned::to_owned),
        priority: task.priority().value(),
        status: task.state().status_str().to_owned(),
        claimed_by,
        claimed_at,
        claim_mode,
        completed_at,
        version: task.version().value(),
        created_by: task.created_by().into_inner(),
        created_at: task.created_at(),
    }
}

pub(crate) fn row_to_task(row: TaskRow) -> Result<Task, CorruptRow> {
    let corrupt = |detail: String| CorruptRow::new("task", row.id, detail);

    let state = match row.status.as_str() {
        "available" => TaskState::Available,
        "claimed" => {
            let claimed_by = row
                .claimed_by
                .ok_or_else(|| corrupt("claimed row without claimant".to_owned()))?;
            let claimed_at = row
                .claimed_at
                .ok_or_else(|| corrupt("claimed row without claim timestamp".to_owned()))?;
            let mode = row
                .claim_mode
                .as_deref()
                .ok_or_else(|| corrupt("claimed row without claim mode".to_owned()))
                .and_then(|raw| {
                    ClaimMode::try_from(raw).map_err(|err| corrupt(err.to_string()))
                })?;
            TaskState::Claimed {
                claimed_by: UserId::from_uuid(claimed_by),
                claimed_at,
                mode,
            }
        }
        "completed" => {
            let completed_at = row
                .completed_at
                .ok_or_else(|| corrupt("completed row without completion timestamp".to_owned()))?;
            TaskState::Completed { completed_at }
        }
        other => return Err(corrupt(format!("unknown status {other}"))),
    };

    let title = TaskTitle::new(row.title).map_err(|err| corrupt(err.to_string()))?;
    let priority = Priority::new(row.priority).map_err(|err| corrupt(err.to_string()))?;
    let version = Version::from_persisted(row.version).map_err(|err| corrupt(err.to_string()))?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        org_id: OrgId::from_uuid(row.org_id),
        project_id: ProjectId::from_uuid(row.project_id),
        type_id: TaskTypeId::from_uuid(row.type_id),
        card_id: row.card_id.map(CardId::from_uuid),
        title,
        description: row.description,
        priority,
        state,
        version,
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
    }))
}

pub(crate) fn card_to_row(card: &Card) -> NewCardRow {
    NewCardRow {
        id: card.id().into_inner(),
        org_id: card.org_id().into_inner(),
        project_id: card.project_id().into_inner(),
        milestone_id: card.milestone_id().map(MilestoneId::into_inner),
        title: card.title().as_str().to_owned(),
        created_by: card.created_by().into_inner(),
        created_at: card.created_at(),
    }
}

pub(crate) fn row_to_card(row: CardRow) -> Result<Card, CorruptRow> {
    let title = TaskTitle::new(row.title)
        .map_err(|err| CorruptRow::new("card", row.id, err.to_string()))?;
    Ok(Card::from_persisted(PersistedCardData {
        id: CardId::from_uuid(row.id),
        org_id: OrgId::from_uuid(row.org_id),
        project_id: ProjectId::from_uuid(row.project_id),
        milestone_id: row.milestone_id.map(MilestoneId::from_uuid),
        title,
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
    }))
}

pub(crate) fn milestone_to_row(milestone: &Milestone) -> NewMilestoneRow {
    NewMilestoneRow {
        id: milestone.id().into_inner(),
        org_id: milestone.org_id().into_inner(),
        project_id: milestone.project_id().into_inner(),
        title: milestone.title().as_str().to_owned(),
        created_by: milestone.created_by().into_inner(),
        created_at: milestone.created_at(),
    }
}

pub(crate) fn row_to_milestone(row: MilestoneRow) -> Result<Milestone, CorruptRow> {
    let title = TaskTitle::new(row.title)
        .map_err(|err| CorruptRow::new("milestone", row.id, err.to_string()))?;
    Ok(Milestone::from_persisted(
        MilestoneId::from_uuid(row.id),
        OrgId::from_uuid(row.org_id),
        ProjectId::from_uuid(row.project_id),
        title,
        UserId::from_uuid(row.created_by),
        row.created_at,
    ))
}
