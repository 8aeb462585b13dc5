use chrono::Utc;
use showrunner_core::{Performance, ProgramOrder};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{datetime_to_millis, parse_ids, parse_uuid, PerformanceRow, PERFORMANCE_COLUMNS};

/// Result of a committed sequence write.
#[derive(Debug, Clone)]
pub struct SequenceCommit {
    pub program: ProgramOrder,
    pub revision: i64,
}

/// Exclusive write transaction over one event's numbered sequence.
///
/// `begin` bumps the event's `sequence_version` as its first statement, which
/// takes SQLite's write lock before anything is read. Dropping the writer
/// without `commit` rolls everything back, including the version bump.
pub struct SequenceWriter {
    tx: Transaction<'static, Sqlite>,
    event_id: Uuid,
    sequence_version: i64,
    revision: i64,
}

impl SequenceWriter {
    pub async fn begin(pool: &SqlitePool, event_id: Uuid) -> Result<Self, DbError> {
        let mut tx = pool.begin().await?;

        let bumped: Option<(i64, i64)> = sqlx::query_as(
            r#"
            UPDATE competition_events
            SET sequence_version = sequence_version + 1, revision = revision + 1
            WHERE id = ?
            RETURNING sequence_version, revision
            "#,
        )
        .bind(event_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((sequence_version, revision)) = bumped else {
            return Err(DbError::EventNotFound(event_id));
        };

        Ok(Self {
            tx,
            event_id,
            sequence_version,
            revision,
        })
    }

    /// Undoes the version bump from `begin` for writes that leave the
    /// numbering as it was. The revision still advances.
    pub async fn preserve_version(&mut self) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE competition_events SET sequence_version = sequence_version - 1 WHERE id = ?",
        )
        .bind(self.event_id.to_string())
        .execute(&mut *self.tx)
        .await?;
        self.sequence_version -= 1;
        Ok(())
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// The version clients saw before this write started.
    pub fn previous_version(&self) -> i64 {
        self.sequence_version - 1
    }

    /// Numbered performances of the event, in item-number order.
    pub async fn numbered_ids(&mut self) -> Result<Vec<Uuid>, DbError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM performances
            WHERE event_id = ? AND item_number IS NOT NULL
            ORDER BY item_number
            "#,
        )
        .bind(self.event_id.to_string())
        .fetch_all(&mut *self.tx)
        .await?;

        parse_ids(rows)
    }

    pub async fn find(&mut self, performance_id: Uuid) -> Result<Option<Performance>, DbError> {
        let sql = format!(
            "SELECT {} FROM performances WHERE id = ? AND event_id = ?",
            PERFORMANCE_COLUMNS
        );
        let row: Option<PerformanceRow> = sqlx::query_as(&sql)
            .bind(performance_id.to_string())
            .bind(self.event_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(PerformanceRow::into_domain).transpose()
    }

    /// Renumbers `ordered` as `1..=len`. Every other performance of the event
    /// ends up unnumbered.
    pub async fn apply_order(&mut self, ordered: &[Uuid]) -> Result<(), DbError> {
        let now = datetime_to_millis(Utc::now());

        // Clear first so the partial unique index never sees two holders.
        sqlx::query(
            r#"
            UPDATE performances SET item_number = NULL, updated_at = ?
            WHERE event_id = ? AND item_number IS NOT NULL
            "#,
        )
        .bind(now)
        .bind(self.event_id.to_string())
        .execute(&mut *self.tx)
        .await?;

        for (pos, id) in ordered.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE performances SET item_number = ?, updated_at = ? WHERE id = ? AND event_id = ?",
            )
            .bind(pos as i64 + 1)
            .bind(now)
            .bind(id.to_string())
            .bind(self.event_id.to_string())
            .execute(&mut *self.tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::PerformanceNotFound(*id));
            }
        }

        Ok(())
    }

    /// Gives `performance_id` the slot `number`. A previous holder takes the
    /// mover's old number (or none). Returns the displaced holder.
    pub async fn move_to(
        &mut self,
        performance_id: Uuid,
        number: u32,
    ) -> Result<Option<Uuid>, DbError> {
        let Some(mover) = self.find(performance_id).await? else {
            return Err(DbError::PerformanceNotFound(performance_id));
        };
        if mover.item_number == Some(number) {
            return Ok(None);
        }

        let holder: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM performances WHERE event_id = ? AND item_number = ?",
        )
        .bind(self.event_id.to_string())
        .bind(i64::from(number))
        .fetch_optional(&mut *self.tx)
        .await?;
        let holder = holder.map(|(id,)| parse_uuid(&id)).transpose()?;

        let now = datetime_to_millis(Utc::now());
        self.set_number(performance_id, None, now).await?;
        if let Some(holder_id) = holder {
            self.set_number(holder_id, mover.item_number, now).await?;
        }
        self.set_number(performance_id, Some(number), now).await?;

        Ok(holder)
    }

    async fn set_number(
        &mut self,
        performance_id: Uuid,
        number: Option<u32>,
        now: i64,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE performances SET item_number = ?, updated_at = ? WHERE id = ?")
            .bind(number.map(i64::from))
            .bind(now)
            .bind(performance_id.to_string())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn insert(&mut self, performance: &Performance) -> Result<(), DbError> {
        let row = PerformanceRow::try_from_domain(performance)?;
        let sql = format!(
            "INSERT INTO performances ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PERFORMANCE_COLUMNS
        );

        sqlx::query(&sql)
            .bind(&row.id)
            .bind(&row.event_id)
            .bind(row.item_number)
            .bind(&row.status)
            .bind(row.withdrawn_from_judging)
            .bind(&row.title)
            .bind(&row.participants)
            .bind(row.duration_seconds)
            .bind(&row.media_ref)
            .bind(row.registration_fee)
            .bind(row.performance_fee)
            .bind(row.total_fee)
            .bind(&row.fee_breakdown)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    /// Deletes the performance; its scores and roster cascade.
    pub async fn delete(&mut self, performance_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM performances WHERE id = ? AND event_id = ?")
            .bind(performance_id.to_string())
            .bind(self.event_id.to_string())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn commit(mut self) -> Result<SequenceCommit, DbError> {
        let order = self.numbered_ids().await?;
        self.tx.commit().await?;

        Ok(SequenceCommit {
            program: ProgramOrder {
                event_id: self.event_id,
                sequence_version: self.sequence_version,
                order,
            },
            revision: self.revision,
        })
    }

    pub async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
