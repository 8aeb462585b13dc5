use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::fee::FeeQuote;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// How a status change relates to the normal running flow.
///
/// Every pair of statuses maps to exactly one kind; none is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StatusTransition {
    Unchanged,
    Advance,
    Correction,
    Cancel,
    Revive,
}

impl PerformanceStatus {
    pub const ALL: [PerformanceStatus; 4] = [
        Self::Scheduled,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Scheduled => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    /// Classifies the move to `to`. Total over all pairs.
    pub fn transition_to(self, to: PerformanceStatus) -> StatusTransition {
        match (self, to) {
            (from, to) if from == to => StatusTransition::Unchanged,
            (_, Self::Cancelled) => StatusTransition::Cancel,
            (Self::Cancelled, _) => StatusTransition::Revive,
            (from, to) if to.rank() > from.rank() => StatusTransition::Advance,
            _ => StatusTransition::Correction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Performance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub item_number: Option<u32>,
    pub status: PerformanceStatus,
    pub withdrawn_from_judging: bool,
    pub title: String,
    pub participants: Vec<String>,
    pub duration_seconds: Option<u32>,
    pub media_ref: Option<String>,
    /// Fee computed at entry creation, stored verbatim.
    pub fee: Option<FeeQuote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Performance {
    pub fn new(event_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            item_number: None,
            status: PerformanceStatus::default(),
            withdrawn_from_judging: false,
            title: title.into(),
            participants: Vec::new(),
            duration_seconds: None,
            media_ref: None,
            fee: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_participants(mut self, participants: Vec<String>) -> Self {
        self.participants = participants;
        self
    }

    pub fn is_visible_to_judges(&self) -> bool {
        !self.withdrawn_from_judging
    }
}

/// Payload of an approved entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct CreatePerformanceRequest {
    pub title: String,
    #[serde(default)]
    pub participants: Vec<String>,
    pub duration_seconds: Option<u32>,
    pub media_ref: Option<String>,
    pub fee: Option<FeeQuote>,
    /// Append to the running order; defaults to true.
    pub numbered: Option<bool>,
}

/// Performance as listed on a judge dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct JudgePerformanceView {
    pub id: Uuid,
    pub item_number: Option<u32>,
    pub title: String,
    pub participants: Vec<String>,
    pub status: PerformanceStatus,
    pub scored: bool,
}
