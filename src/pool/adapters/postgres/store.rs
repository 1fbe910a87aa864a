//! `PostgreSQL` transactional store for task mutations.
//!
//! Each unit of work runs inside one Diesel transaction on a blocking
//! thread; guarded updates (`UPDATE ... WHERE version = $expected`) close
//! the optimistic-concurrency race at the row level.

use super::models::{TaskRow, row_to_card, row_to_task, task_to_row};
use super::schema::{cards, tasks};
use crate::pool::domain::{
    Card, CardId, MilestoneId, MilestoneProgress, Task, TaskCounts, TaskId, Version,
};
use crate::pool::ports::store::{
    MutationTransaction, StoreError, StoreResult, TaskStore, UpdateOutcome,
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use uuid::Uuid;

/// `PostgreSQL` connection pool type used by pool adapters.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed [`TaskStore`].
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Bridges the work closure's error type through Diesel's transaction
/// machinery, which requires `From<diesel::result::Error>`.
enum TxError<E> {
    Abort(E),
    Database(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn MutationTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(StoreError::persistence(err)))?;
            let result = connection.transaction::<T, TxError<E>, _>(|conn| {
                let mut transaction = PgTransaction { conn };
                work(&mut transaction).map_err(TxError::Abort)
            });
            result.map_err(|err| match err {
                TxError::Abort(abort) => abort,
                TxError::Database(db) => E::from(StoreError::persistence(db)),
            })
        })
        .await
        .map_err(|err| E::from(StoreError::persistence(err)))?
    }
}

/// One open Diesel transaction exposed through the mutation port.
pub(crate) struct PgTransaction<'a> {
    pub(crate) conn: &'a mut PgConnection,
}

impl PgTransaction<'_> {
    fn stored_version(&mut self, id: TaskId) -> StoreResult<Option<Version>> {
        let version = tasks::table
            .filter(tasks::id.eq(id.into_inner()))
            .select(tasks::version)
            .first::<i64>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        version
            .map(|value| Version::from_persisted(value).map_err(StoreError::persistence))
            .transpose()
    }

    fn guarded_outcome(&mut self, id: TaskId, rows: usize) -> StoreResult<UpdateOutcome> {
        if rows > 0 {
            return Ok(UpdateOutcome::Updated);
        }
        match self.stored_version(id)? {
            Some(actual) => Ok(UpdateOutcome::VersionConflict { actual }),
            None => Ok(UpdateOutcome::Missing),
        }
    }

    pub(crate) fn count_card_tasks(&mut self, card_id: Uuid) -> StoreResult<TaskCounts> {
        let total = self.count_tasks(card_id, None)?;
        let completed = self.count_tasks(card_id, Some("completed"))?;
        let available = self.count_tasks(card_id, Some("available"))?;
        Ok(TaskCounts::new(total, completed, available))
    }

    fn count_tasks(&mut self, card_id: Uuid, status: Option<&str>) -> StoreResult<u64> {
        let count: i64 = match status {
            None => tasks::table
                .filter(tasks::card_id.eq(card_id))
                .count()
                .get_result(self.conn)
                .map_err(StoreError::persistence)?,
            Some(status_value) => tasks::table
                .filter(tasks::card_id.eq(card_id))
                .filter(tasks::status.eq(status_value))
                .count()
                .get_result(self.conn)
                .map_err(StoreError::persistence)?,
        };
        u64::try_from(count).map_err(StoreError::persistence)
    }
}

impl MutationTransaction for PgTransaction<'_> {
    fn load_task(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        let row = tasks::table
            .filter(tasks::id.eq(id.into_inner()))
            .select(TaskRow::as_select())
            .first::<TaskRow>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(|found| row_to_task(found).map_err(StoreError::persistence))
            .transpose()
    }

    fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        diesel::insert_into(tasks::table)
            .values(task_to_row(task))
            .execute(self.conn)
            .map_err(StoreError::persistence)?;
        Ok(())
    }

    fn update_task_guarded(&mut self, task: &Task, expected: Version) -> StoreResult<UpdateOutcome> {
        let changes = task_to_row(task);
        let rows = diesel::update(
            tasks::table
                .filter(tasks::id.eq(task.id().into_inner()))
                .filter(tasks::version.eq(expected.value())),
        )
        .set(&changes)
        .execute(self.conn)
        .map_err(StoreError::persistence)?;
        self.guarded_outcome(task.id(), rows)
    }

    fn delete_task_guarded(&mut self, id: TaskId, expected: Version) -> StoreResult<UpdateOutcome> {
        let rows = diesel::delete(
            tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .filter(tasks::version.eq(expected.value())),
        )
        .execute(self.conn)
        .map_err(StoreError::persistence)?;
        self.guarded_outcome(id, rows)
    }

    fn load_card(&mut self, id: CardId) -> StoreResult<Option<Card>> {
        let row = cards::table
            .filter(cards::id.eq(id.into_inner()))
            .select(super::models::CardRow::as_select())
            .first(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(|found| row_to_card(found).map_err(StoreError::persistence))
            .transpose()
    }

    fn card_task_counts(&mut self, id: CardId) -> StoreResult<TaskCounts> {
        self.count_card_tasks(id.into_inner())
    }

    fn milestone_progress(&mut self, id: MilestoneId) -> StoreResult<MilestoneProgress> {
        let card_ids: Vec<Uuid> = cards::table
            .filter(cards::milestone_id.eq(id.into_inner()))
            .select(cards::id)
            .load(self.conn)
            .map_err(StoreError::persistence)?;
        let mut per_card = Vec::with_capacity(card_ids.len());
        for card_id in card_ids {
            per_card.push(self.count_card_tasks(card_id)?);
        }
        Ok(MilestoneProgress::from_card_counts(per_card))
    }
}
