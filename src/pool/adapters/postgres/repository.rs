//! `PostgreSQL` board repository for card/milestone reads and admin
//! writes.

use super::models::{
    CardRow, MilestoneRow, TaskRow, card_to_row, milestone_to_row, row_to_card, row_to_milestone,
    row_to_task,
};
use super::schema::{cards, milestones, tasks};
use super::store::PgPool;
use crate::pool::domain::{
    Card, CardId, Milestone, MilestoneId, Task, TaskCounts, TaskId,
};
use crate::pool::ports::repository::{
    BoardRepository, BoardRepositoryError, BoardRepositoryResult,
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

/// `PostgreSQL`-backed [`BoardRepository`].
#[derive(Debug, Clone)]
pub struct PostgresBoardRepository {
    pool: PgPool,
}

impl PostgresBoardRepository {
    /// Creates a repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> BoardRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> BoardRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(BoardRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(BoardRepositoryError::persistence)?
    }
}

fn count_card_tasks(
    connection: &mut PgConnection,
    card_id: Uuid,
) -> BoardRepositoryResult<TaskCounts> {
    let count = |connection: &mut PgConnection,
                 status: Option<&str>|
     -> BoardRepositoryResult<u64> {
        let total: i64 = match status {
            None => tasks::table
                .filter(tasks::card_id.eq(card_id))
                .count()
                .get_result(connection)
                .map_err(BoardRepositoryError::persistence)?,
            Some(status_value) => tasks::table
                .filter(tasks::card_id.eq(card_id))
                .filter(tasks::status.eq(status_value))
                .count()
                .get_result(connection)
                .map_err(BoardRepositoryError::persistence)?,
        };
        u64::try_from(total).map_err(BoardRepositoryError::persistence)
    };
    Ok(TaskCounts::new(
        count(connection, None)?,
        count(connection, Some("completed"))?,
        count(connection, Some("available"))?,
    ))
}

#[async_trait]
impl BoardRepository for PostgresBoardRepository {
    async fn insert_card(&self, card: &Card) -> BoardRepositoryResult<()> {
        let card_id = card.id();
        let row = card_to_row(card);
        self.run_blocking(move |connection| {
            diesel::insert_into(cards::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        BoardRepositoryError::DuplicateCard(card_id)
                    }
                    other => BoardRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn insert_milestone(&self, milestone: &Milestone) -> BoardRepositoryResult<()> {
        let milestone_id = milestone.id();
        let row = milestone_to_row(milestone);
        self.run_blocking(move |connection| {
            diesel::insert_into(milestones::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        BoardRepositoryError::DuplicateMilestone(milestone_id)
                    }
                    other => BoardRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> BoardRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(BoardRepositoryError::persistence)?;
            row.map(|found| row_to_task(found).map_err(BoardRepositoryError::persistence))
                .transpose()
        })
        .await
    }

    async fn find_card(&self, id: CardId) -> BoardRepositoryResult<Option<Card>> {
        self.run_blocking(move |connection| {
            let row = cards::table
                .filter(cards::id.eq(id.into_inner()))
                .select(CardRow::as_select())
                .first::<CardRow>(connection)
                .optional()
                .map_err(BoardRepositoryError::persistence)?;
            row.map(|found| row_to_card(found).map_err(BoardRepositoryError::persistence))
                .transpose()
        })
        .await
    }

    async fn find_milestone(&self, id: MilestoneId) -> BoardRepositoryResult<Option<Milestone>> {
        self.run_blocking(move |connection| {
            let row = milestones::table
                .filter(milestones::id.eq(id.into_inner()))
                .select(MilestoneRow::as_select())
                .first::<MilestoneRow>(connection)
                .optional()
                .map_err(BoardRepositoryError::persistence)?;
            row.map(|found| {
                row_to_milestone(found).map_err(BoardRepositoryError::persistence)
            })
            .transpose()
        })
        .await
    }

    async fn list_tasks_by_card(&self, id: CardId) -> BoardRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::card_id.eq(id.into_inner()))
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(BoardRepositoryError::persistence)?;
            rows.into_iter()
                .map(|row| row_to_task(row).map_err(BoardRepositoryError::persistence))
                .collect()
        })
        .await
    }

    async fn card_task_counts(&self, id: CardId) -> BoardRepositoryResult<TaskCounts> {
        self.run_blocking(move |connection| count_card_tasks(connection, id.into_inner()))
            .await
    }

    async fn milestone_card_counts(
        &self,
        id: MilestoneId,
    ) -> BoardRepositoryResult<Vec<TaskCounts>> {
        self.run_blocking(move |connection| {
            let card_ids: Vec<Uuid> = cards::table
                .filter(cards::milestone_id.eq(id.into_inner()))
                .select(cards::id)
                .load(connection)
                .map_err(BoardRepositoryError::persistence)?;
            card_ids
                .into_iter()
                .map(|card_id| count_card_tasks(connection, card_id))
                .collect()
        })
        .await
    }
}
