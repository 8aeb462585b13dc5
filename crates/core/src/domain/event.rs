use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A competition event whose performances share one running order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CompetitionEvent {
    pub id: Uuid,
    pub name: String,
    /// Bumped on every change to the numbered sequence.
    pub sequence_version: i64,
    /// Bumped on every change that is broadcast to viewers.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
}

impl CompetitionEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            sequence_version: 0,
            revision: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
}

/// Authoritative running order of an event.
///
/// `order[i]` holds item number `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgramOrder {
    pub event_id: Uuid,
    pub sequence_version: i64,
    pub order: Vec<Uuid>,
}

impl ProgramOrder {
    pub fn item_number_of(&self, performance_id: Uuid) -> Option<u32> {
        self.order
            .iter()
            .position(|id| *id == performance_id)
            .map(|pos| pos as u32 + 1)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Returns true when `numbers` is exactly `{1..=numbers.len()}` with no repeats.
pub fn is_dense_sequence(numbers: &[u32]) -> bool {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(pos, number)| *number == pos as u32 + 1)
}
