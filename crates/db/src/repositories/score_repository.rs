use chrono::Utc;
use showrunner_core::{Score, ScoreDeletionRecord};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::event_repository::bump_revision;
use crate::error::DbError;
use crate::models::{
    datetime_to_millis, millis_to_datetime, parse_ids, parse_uuid, ScoreRow, SCORE_COLUMNS,
};

/// Outcome of a conditional score upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreWrite {
    Stored { event_id: Uuid, revision: i64 },
    Withdrawn,
    PerformanceMissing,
}

#[derive(Debug, Clone)]
pub struct ScoreDeletion {
    pub score: Score,
    pub event_id: Uuid,
    pub revision: i64,
}

#[derive(Clone)]
pub struct ScoreRepository {
    pool: SqlitePool,
}

impl ScoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts keyed by (performance, judge), but only while the performance
    /// is open for judging. The withdrawal check and the write are one
    /// statement, so a withdrawal committed first always rejects the score.
    pub async fn upsert_if_judgeable(&self, score: &Score) -> Result<ScoreWrite, DbError> {
        let row = ScoreRow::from(score);
        let mut tx = self.pool.begin().await?;

        let stored: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO scores (performance_id, judge_id, dim1, dim2, dim3, dim4, dim5, total, comments, submitted_at)
            SELECT id, ?, ?, ?, ?, ?, ?, ?, ?, ?
            FROM performances
            WHERE id = ? AND withdrawn_from_judging = 0
            ON CONFLICT (performance_id, judge_id) DO UPDATE SET
                dim1 = excluded.dim1,
                dim2 = excluded.dim2,
                dim3 = excluded.dim3,
                dim4 = excluded.dim4,
                dim5 = excluded.dim5,
                total = excluded.total,
                comments = excluded.comments,
                submitted_at = excluded.submitted_at
            RETURNING performance_id
            "#,
        )
        .bind(&row.judge_id)
        .bind(row.dim1)
        .bind(row.dim2)
        .bind(row.dim3)
        .bind(row.dim4)
        .bind(row.dim5)
        .bind(row.total)
        .bind(&row.comments)
        .bind(row.submitted_at)
        .bind(&row.performance_id)
        .fetch_optional(&mut *tx)
        .await?;

        if stored.is_none() {
            let state: Option<(bool,)> =
                sqlx::query_as("SELECT withdrawn_from_judging FROM performances WHERE id = ?")
                    .bind(&row.performance_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Ok(match state {
                Some(_) => ScoreWrite::Withdrawn,
                None => ScoreWrite::PerformanceMissing,
            });
        }

        let (event_id,): (String,) =
            sqlx::query_as("SELECT event_id FROM performances WHERE id = ?")
                .bind(&row.performance_id)
                .fetch_one(&mut *tx)
                .await?;
        let event_id = parse_uuid(&event_id)?;
        let revision = bump_revision(&mut tx, event_id).await?;
        tx.commit().await?;

        Ok(ScoreWrite::Stored { event_id, revision })
    }

    pub async fn find(&self, performance_id: Uuid, judge_id: Uuid) -> Result<Option<Score>, DbError> {
        let sql = format!(
            "SELECT {} FROM scores WHERE performance_id = ? AND judge_id = ?",
            SCORE_COLUMNS
        );
        let row: Option<ScoreRow> = sqlx::query_as(&sql)
            .bind(performance_id.to_string())
            .bind(judge_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ScoreRow::into_domain).transpose()
    }

    pub async fn find_by_performance(&self, performance_id: Uuid) -> Result<Vec<Score>, DbError> {
        let sql = format!(
            "SELECT {} FROM scores WHERE performance_id = ? ORDER BY submitted_at",
            SCORE_COLUMNS
        );
        let rows: Vec<ScoreRow> = sqlx::query_as(&sql)
            .bind(performance_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ScoreRow::into_domain).collect()
    }

    pub async fn scored_judge_ids(&self, performance_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT judge_id FROM scores WHERE performance_id = ?")
                .bind(performance_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        parse_ids(rows)
    }

    /// (performance, judge, total) for every score in the event.
    pub async fn totals_for_event(&self, event_id: Uuid) -> Result<Vec<(Uuid, Uuid, u32)>, DbError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT s.performance_id, s.judge_id, s.total
            FROM scores s
            JOIN performances p ON p.id = s.performance_id
            WHERE p.event_id = ?
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(performance_id, judge_id, total)| {
                Ok((parse_uuid(&performance_id)?, parse_uuid(&judge_id)?, total as u32))
            })
            .collect()
    }

    /// Removes one judge's score and records why.
    pub async fn delete_with_audit(
        &self,
        performance_id: Uuid,
        judge_id: Uuid,
        reason: &str,
        deleted_by: Option<Uuid>,
    ) -> Result<Option<ScoreDeletion>, DbError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "DELETE FROM scores WHERE performance_id = ? AND judge_id = ? RETURNING {}",
            SCORE_COLUMNS
        );
        let deleted: Option<ScoreRow> = sqlx::query_as(&sql)
            .bind(performance_id.to_string())
            .bind(judge_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = deleted else {
            tx.rollback().await?;
            return Ok(None);
        };
        let score = row.into_domain()?;

        sqlx::query(
            r#"
            INSERT INTO score_deletions (performance_id, judge_id, total, reason, deleted_by, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(score.performance_id.to_string())
        .bind(score.judge_id.to_string())
        .bind(i64::from(score.total))
        .bind(reason)
        .bind(deleted_by.map(|id| id.to_string()))
        .bind(datetime_to_millis(Utc::now()))
        .execute(&mut *tx)
        .await?;

        let (event_id,): (String,) =
            sqlx::query_as("SELECT event_id FROM performances WHERE id = ?")
                .bind(performance_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        let event_id = parse_uuid(&event_id)?;
        let revision = bump_revision(&mut tx, event_id).await?;
        tx.commit().await?;

        Ok(Some(ScoreDeletion {
            score,
            event_id,
            revision,
        }))
    }

    pub async fn audit_for_performance(
        &self,
        performance_id: Uuid,
    ) -> Result<Vec<ScoreDeletionRecord>, DbError> {
        let rows: Vec<(String, String, i64, String, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT performance_id, judge_id, total, reason, deleted_by, deleted_at
            FROM score_deletions
            WHERE performance_id = ?
            ORDER BY id
            "#,
        )
        .bind(performance_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(performance_id, judge_id, total, reason, deleted_by, deleted_at)| {
                Ok(ScoreDeletionRecord {
                    performance_id: parse_uuid(&performance_id)?,
                    judge_id: parse_uuid(&judge_id)?,
                    total: total as u32,
                    reason,
                    deleted_by: deleted_by.as_deref().map(parse_uuid).transpose()?,
                    deleted_at: millis_to_datetime(deleted_at),
                })
            })
            .collect()
    }
}
