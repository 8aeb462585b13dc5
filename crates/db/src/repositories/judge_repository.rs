use chrono::Utc;
use showrunner_core::JudgeAssignment;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{datetime_to_millis, millis_to_datetime, parse_ids, parse_uuid};

/// Event-wide judge rosters plus optional per-performance overrides.
#[derive(Clone)]
pub struct JudgeRepository {
    pool: SqlitePool,
}

impl JudgeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent: assigning an already rostered judge keeps the original row.
    pub async fn assign(&self, event_id: Uuid, judge_id: Uuid) -> Result<JudgeAssignment, DbError> {
        let exists: Option<(String,)> =
            sqlx::query_as("SELECT id FROM competition_events WHERE id = ?")
                .bind(event_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(DbError::EventNotFound(event_id));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO event_judges (event_id, judge_id, assigned_at) VALUES (?, ?, ?)",
        )
        .bind(event_id.to_string())
        .bind(judge_id.to_string())
        .bind(datetime_to_millis(Utc::now()))
        .execute(&self.pool)
        .await?;

        let (assigned_at,): (i64,) = sqlx::query_as(
            "SELECT assigned_at FROM event_judges WHERE event_id = ? AND judge_id = ?",
        )
        .bind(event_id.to_string())
        .bind(judge_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(JudgeAssignment {
            event_id,
            judge_id,
            assigned_at: millis_to_datetime(assigned_at),
        })
    }

    pub async fn unassign(&self, event_id: Uuid, judge_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM event_judges WHERE event_id = ? AND judge_id = ?")
            .bind(event_id.to_string())
            .bind(judge_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<JudgeAssignment>, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT judge_id, assigned_at FROM event_judges WHERE event_id = ? ORDER BY assigned_at, judge_id",
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(judge_id, assigned_at)| {
                Ok(JudgeAssignment {
                    event_id,
                    judge_id: parse_uuid(&judge_id)?,
                    assigned_at: millis_to_datetime(assigned_at),
                })
            })
            .collect()
    }

    /// Replaces the performance's own roster. An empty list falls back to the
    /// event roster.
    pub async fn set_performance_roster(
        &self,
        performance_id: Uuid,
        judge_ids: &[Uuid],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM performance_judges WHERE performance_id = ?")
            .bind(performance_id.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT id FROM performances WHERE id = ?")
                    .bind(performance_id.to_string())
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(DbError::PerformanceNotFound(performance_id));
            }
        }

        for judge_id in judge_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO performance_judges (performance_id, judge_id) VALUES (?, ?)",
            )
            .bind(performance_id.to_string())
            .bind(judge_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn clear_performance_roster(&self, performance_id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM performance_judges WHERE performance_id = ?")
            .bind(performance_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Judges expected to score the performance.
    pub async fn roster_for_performance(&self, performance_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let own: Vec<(String,)> = sqlx::query_as(
            "SELECT judge_id FROM performance_judges WHERE performance_id = ? ORDER BY judge_id",
        )
        .bind(performance_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let rows = if own.is_empty() {
            sqlx::query_as(
                r#"
                SELECT ej.judge_id
                FROM event_judges ej
                JOIN performances p ON p.event_id = ej.event_id
                WHERE p.id = ?
                ORDER BY ej.assigned_at, ej.judge_id
                "#,
            )
            .bind(performance_id.to_string())
            .fetch_all(&self.pool)
            .await?
        } else {
            own
        };

        parse_ids(rows)
    }
}
