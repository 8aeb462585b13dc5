use showrunner_core::CompetitionEvent;

use super::{datetime_to_millis, millis_to_datetime, parse_uuid};
use crate::error::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    pub sequence_version: i64,
    pub revision: i64,
    pub created_at: i64,
}

impl EventRow {
    pub fn into_domain(self) -> Result<CompetitionEvent, DbError> {
        Ok(CompetitionEvent {
            id: parse_uuid(&self.id)?,
            name: self.name,
            sequence_version: self.sequence_version,
            revision: self.revision,
            created_at: millis_to_datetime(self.created_at),
        })
    }
}

impl From<&CompetitionEvent> for EventRow {
    fn from(event: &CompetitionEvent) -> Self {
        Self {
            id: event.id.to_string(),
            name: event.name.clone(),
            sequence_version: event.sequence_version,
            revision: event.revision,
            created_at: datetime_to_millis(event.created_at),
        }
    }
}
