use crate::error::DbError;
use crate::models::EventRow;
use showrunner_core::CompetitionEvent;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, event: &CompetitionEvent) -> Result<CompetitionEvent, DbError> {
        let row = EventRow::from(event);

        sqlx::query(
            r#"
            INSERT INTO competition_events (id, name, sequence_version, revision, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(row.sequence_version)
        .bind(row.revision)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(event.clone())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CompetitionEvent>, DbError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, sequence_version, revision, created_at
            FROM competition_events
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRow::into_domain).transpose()
    }

    pub async fn find_all(&self) -> Result<Vec<CompetitionEvent>, DbError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, sequence_version, revision, created_at
            FROM competition_events
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_domain).collect()
    }

    /// Cascades to performances, scores and rosters.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM competition_events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Advances the revision for a change that touches no other table.
    pub async fn advance_revision(&self, id: Uuid) -> Result<i64, DbError> {
        let mut conn = self.pool.acquire().await?;
        bump_revision(&mut conn, id).await
    }
}

/// Advances the broadcast counter of an event inside the caller's transaction.
pub(crate) async fn bump_revision(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<i64, DbError> {
    let revision: Option<(i64,)> = sqlx::query_as(
        "UPDATE competition_events SET revision = revision + 1 WHERE id = ? RETURNING revision",
    )
    .bind(event_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    revision
        .map(|(r,)| r)
        .ok_or(DbError::EventNotFound(event_id))
}
