use chrono::Utc;
use showrunner_core::{JudgePerformanceView, Performance, PerformanceStatus, ProgramOrder};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::event_repository::bump_revision;
use super::sequence_writer::SequenceWriter;
use crate::error::DbError;
use crate::models::{
    datetime_to_millis, parse_ids, parse_status, parse_uuid, PerformanceRow, PERFORMANCE_COLUMNS,
};

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub performance: Performance,
    pub previous: PerformanceStatus,
    pub revision: i64,
}

#[derive(Debug, Clone)]
pub struct WithdrawalUpdate {
    pub performance: Performance,
    /// `None` when the flag already had the requested value.
    pub revision: Option<i64>,
}

impl WithdrawalUpdate {
    pub fn changed(&self) -> bool {
        self.revision.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct StatusReset {
    pub reset_ids: Vec<Uuid>,
    pub revision: i64,
}

#[derive(Clone)]
pub struct PerformanceRepository {
    pool: SqlitePool,
}

impl PerformanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens an exclusive write over the event's running order.
    pub async fn sequence(&self, event_id: Uuid) -> Result<SequenceWriter, DbError> {
        SequenceWriter::begin(&self.pool, event_id).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Performance>, DbError> {
        let sql = format!("SELECT {} FROM performances WHERE id = ?", PERFORMANCE_COLUMNS);
        let row: Option<PerformanceRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(PerformanceRow::into_domain).transpose()
    }

    /// Numbered performances first in running order, then unnumbered ones by
    /// creation time.
    pub async fn find_by_event(
        &self,
        event_id: Uuid,
        status: Option<PerformanceStatus>,
    ) -> Result<Vec<Performance>, DbError> {
        let sql = format!(
            r#"
            SELECT {} FROM performances
            WHERE event_id = ? AND (? IS NULL OR status = ?)
            ORDER BY item_number IS NULL, item_number, created_at
            "#,
            PERFORMANCE_COLUMNS
        );
        let status = status.map(|s| s.as_str());
        let rows: Vec<PerformanceRow> = sqlx::query_as(&sql)
            .bind(event_id.to_string())
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PerformanceRow::into_domain).collect()
    }

    /// Judge dashboard listing. Withdrawn performances are never returned,
    /// whatever the status filter.
    pub async fn find_for_judge(
        &self,
        event_id: Uuid,
        judge_id: Uuid,
        status: Option<PerformanceStatus>,
    ) -> Result<Vec<JudgePerformanceView>, DbError> {
        let status = status.map(|s| s.as_str());
        let rows: Vec<(String, Option<i64>, String, String, String, bool)> = sqlx::query_as(
            r#"
            SELECT p.id, p.item_number, p.title, p.participants, p.status,
                   EXISTS (
                       SELECT 1 FROM scores s
                       WHERE s.performance_id = p.id AND s.judge_id = ?
                   ) AS scored
            FROM performances p
            WHERE p.event_id = ?
              AND p.withdrawn_from_judging = 0
              AND (? IS NULL OR p.status = ?)
            ORDER BY p.item_number IS NULL, p.item_number, p.created_at
            "#,
        )
        .bind(judge_id.to_string())
        .bind(event_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, item_number, title, participants, status, scored)| {
                Ok(JudgePerformanceView {
                    id: parse_uuid(&id)?,
                    item_number: item_number.map(|n| n as u32),
                    title,
                    participants: serde_json::from_str(&participants)?,
                    status: parse_status(&status)?,
                    scored,
                })
            })
            .collect()
    }

    pub async fn program(&self, event_id: Uuid) -> Result<Option<ProgramOrder>, DbError> {
        let version: Option<(i64,)> =
            sqlx::query_as("SELECT sequence_version FROM competition_events WHERE id = ?")
                .bind(event_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        let Some((sequence_version,)) = version else {
            return Ok(None);
        };

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM performances
            WHERE event_id = ? AND item_number IS NOT NULL
            ORDER BY item_number
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProgramOrder {
            event_id,
            sequence_version,
            order: parse_ids(rows)?,
        }))
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: PerformanceStatus,
    ) -> Result<Option<StatusUpdate>, DbError> {
        let mut tx = self.pool.begin().await?;
        let now = datetime_to_millis(Utc::now());

        // Touch the row first: the write lock is taken before reading, and
        // RETURNING still shows the old status.
        let previous: Option<(String, String)> = sqlx::query_as(
            "UPDATE performances SET updated_at = ? WHERE id = ? RETURNING event_id, status",
        )
        .bind(now)
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((event_id, previous)) = previous else {
            return Ok(None);
        };

        sqlx::query("UPDATE performances SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let event_id = parse_uuid(&event_id)?;
        let revision = bump_revision(&mut tx, event_id).await?;

        let sql = format!("SELECT {} FROM performances WHERE id = ?", PERFORMANCE_COLUMNS);
        let row: PerformanceRow = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(StatusUpdate {
            performance: row.into_domain()?,
            previous: parse_status(&previous)?,
            revision,
        }))
    }

    /// Sets the withdrawal flag. Never touches status or item number.
    pub async fn set_withdrawn(
        &self,
        id: Uuid,
        withdrawn: bool,
    ) -> Result<Option<WithdrawalUpdate>, DbError> {
        let mut tx = self.pool.begin().await?;
        let now = datetime_to_millis(Utc::now());

        let changed: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE performances
            SET withdrawn_from_judging = ?, updated_at = ?
            WHERE id = ? AND withdrawn_from_judging <> ?
            RETURNING event_id
            "#,
        )
        .bind(withdrawn)
        .bind(now)
        .bind(id.to_string())
        .bind(withdrawn)
        .fetch_optional(&mut *tx)
        .await?;

        let revision = match changed {
            Some((event_id,)) => {
                let event_id = parse_uuid(&event_id)?;
                Some(bump_revision(&mut tx, event_id).await?)
            }
            None => None,
        };

        let sql = format!("SELECT {} FROM performances WHERE id = ?", PERFORMANCE_COLUMNS);
        let row: Option<PerformanceRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        row.map(|r| {
            Ok(WithdrawalUpdate {
                performance: r.into_domain()?,
                revision,
            })
        })
        .transpose()
    }

    /// Returns every performance of the event to `scheduled`.
    pub async fn reset_statuses(&self, event_id: Uuid) -> Result<StatusReset, DbError> {
        let mut tx = self.pool.begin().await?;
        let revision = bump_revision(&mut tx, event_id).await?;

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            UPDATE performances
            SET status = 'scheduled', updated_at = ?
            WHERE event_id = ? AND status <> 'scheduled'
            RETURNING id
            "#,
        )
        .bind(datetime_to_millis(Utc::now()))
        .bind(event_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(StatusReset {
            reset_ids: parse_ids(rows)?,
            revision,
        })
    }

    pub async fn count_by_event(&self, event_id: Uuid) -> Result<(i64, i64, i64), DbError> {
        let counts: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(item_number),
                   COALESCE(SUM(withdrawn_from_judging), 0)
            FROM performances
            WHERE event_id = ?
            "#,
        )
        .bind(event_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
