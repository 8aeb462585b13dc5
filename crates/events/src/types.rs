use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use showrunner_core::{PerformanceStatus, StatusTransition};
use utoipa::ToSchema;
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EventEnvelope {
    /// Unique envelope ID, also used as the SSE event id
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Competition event the payload belongs to
    pub event_id: Option<Uuid>,
    /// Commit counter of `event_id` at publication. Monotonic per event;
    /// envelopes produced by the same commit share it.
    pub revision: i64,
    pub event: Event,
}

impl EventEnvelope {
    /// Envelope for a committed change of one competition event.
    pub fn for_revision(revision: i64, event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_id: event.event_id(),
            revision,
            event,
        }
    }

    /// Envelope that is not tied to a commit (errors, notices).
    pub fn new(event: Event) -> Self {
        Self::for_revision(0, event)
    }
}

/// Everything viewers can be told about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The numbered program of an event changed
    #[serde(rename = "sequence.changed")]
    SequenceChanged {
        event_id: Uuid,
        sequence_version: i64,
        order: Vec<Uuid>,
    },

    #[serde(rename = "status.changed")]
    StatusChanged {
        event_id: Uuid,
        performance_id: Uuid,
        from_status: PerformanceStatus,
        to_status: PerformanceStatus,
        transition: StatusTransition,
    },

    /// Judge visibility of a performance changed
    #[serde(rename = "withdrawal.changed")]
    WithdrawalChanged {
        event_id: Uuid,
        performance_id: Uuid,
        withdrawn: bool,
    },

    #[serde(rename = "performance.created")]
    PerformanceCreated {
        event_id: Uuid,
        performance_id: Uuid,
        item_number: Option<u32>,
        title: String,
    },

    #[serde(rename = "performance.deleted")]
    PerformanceDeleted { event_id: Uuid, performance_id: Uuid },

    #[serde(rename = "score.submitted")]
    ScoreSubmitted {
        event_id: Uuid,
        performance_id: Uuid,
        judge_id: Uuid,
        total: u32,
    },

    #[serde(rename = "score.deleted")]
    ScoreDeleted {
        event_id: Uuid,
        performance_id: Uuid,
        judge_id: Uuid,
    },

    /// The performance currently on stage, if any
    #[serde(rename = "current.changed")]
    CurrentChanged {
        event_id: Uuid,
        performance_id: Option<Uuid>,
    },

    /// Every performance went back to scheduled
    #[serde(rename = "event.reset")]
    EventReset {
        event_id: Uuid,
        reset_performance_ids: Vec<Uuid>,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// Get the competition event ID associated with this event, if any
    pub fn event_id(&self) -> Option<Uuid> {
        match self {
            Event::SequenceChanged { event_id, .. }
            | Event::StatusChanged { event_id, .. }
            | Event::WithdrawalChanged { event_id, .. }
            | Event::PerformanceCreated { event_id, .. }
            | Event::PerformanceDeleted { event_id, .. }
            | Event::ScoreSubmitted { event_id, .. }
            | Event::ScoreDeleted { event_id, .. }
            | Event::CurrentChanged { event_id, .. }
            | Event::EventReset { event_id, .. } => Some(*event_id),
            Event::Error { .. } => None,
        }
    }

    /// Wire name, also used as the SSE event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SequenceChanged { .. } => "sequence.changed",
            Event::StatusChanged { .. } => "status.changed",
            Event::WithdrawalChanged { .. } => "withdrawal.changed",
            Event::PerformanceCreated { .. } => "performance.created",
            Event::PerformanceDeleted { .. } => "performance.deleted",
            Event::ScoreSubmitted { .. } => "score.submitted",
            Event::ScoreDeleted { .. } => "score.deleted",
            Event::CurrentChanged { .. } => "current.changed",
            Event::EventReset { .. } => "event.reset",
            Event::Error { .. } => "error",
        }
    }
}
