use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Binding of a judge to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct JudgeAssignment {
    pub event_id: Uuid,
    pub judge_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

impl JudgeAssignment {
    pub fn new(event_id: Uuid, judge_id: Uuid) -> Self {
        Self {
            event_id,
            judge_id,
            assigned_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignJudgeRequest {
    pub judge_id: Uuid,
}

/// Replaces the event roster for a single performance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformanceRosterRequest {
    pub judge_ids: Vec<Uuid>,
}
