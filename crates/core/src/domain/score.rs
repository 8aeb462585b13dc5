use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;

pub const DIMENSION_COUNT: usize = 5;
pub const MIN_DIMENSION_SCORE: u8 = 1;
pub const MAX_DIMENSION_SCORE: u8 = 20;

/// The five per-dimension marks of one score, each in `1..=20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export, as = "Vec<i64>"))]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
#[schema(value_type = Vec<i64>)]
pub struct ScoreDimensions([u8; DIMENSION_COUNT]);

impl ScoreDimensions {
    /// Validates raw input. Nothing is accepted unless all five marks are.
    pub fn try_from_values(values: &[i64]) -> Result<Self, CoreError> {
        if values.len() != DIMENSION_COUNT {
            return Err(CoreError::Validation(format!(
                "expected {} dimension scores, got {}",
                DIMENSION_COUNT,
                values.len()
            )));
        }

        let mut marks = [0u8; DIMENSION_COUNT];
        for (idx, value) in values.iter().enumerate() {
            if *value < i64::from(MIN_DIMENSION_SCORE) || *value > i64::from(MAX_DIMENSION_SCORE) {
                return Err(CoreError::Validation(format!(
                    "dimension {} must be between {} and {}, got {}",
                    idx + 1,
                    MIN_DIMENSION_SCORE,
                    MAX_DIMENSION_SCORE,
                    value
                )));
            }
            marks[idx] = *value as u8;
        }

        Ok(Self(marks))
    }

    pub fn values(&self) -> [u8; DIMENSION_COUNT] {
        self.0
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|mark| u32::from(*mark)).sum()
    }
}

impl TryFrom<Vec<i64>> for ScoreDimensions {
    type Error = CoreError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        Self::try_from_values(&values)
    }
}

impl From<ScoreDimensions> for Vec<i64> {
    fn from(dimensions: ScoreDimensions) -> Self {
        dimensions.0.iter().map(|mark| i64::from(*mark)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Score {
    pub performance_id: Uuid,
    pub judge_id: Uuid,
    pub dimensions: ScoreDimensions,
    pub total: u32,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Score {
    pub fn new(
        performance_id: Uuid,
        judge_id: Uuid,
        dimensions: ScoreDimensions,
        comments: Option<String>,
    ) -> Self {
        Self {
            performance_id,
            judge_id,
            total: dimensions.total(),
            dimensions,
            comments: comments.filter(|c| !c.trim().is_empty()),
            submitted_at: Utc::now(),
        }
    }
}

/// Raw submission. Dimensions stay unvalidated so that range errors surface
/// as validation failures instead of body-parsing failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitScoreRequest {
    pub dimensions: Vec<i64>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteScoreRequest {
    pub reason: String,
}

/// Audit row left behind by an admin score deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoreDeletionRecord {
    pub performance_id: Uuid,
    pub judge_id: Uuid,
    pub total: u32,
    pub reason: String,
    pub deleted_by: Option<Uuid>,
    pub deleted_at: DateTime<Utc>,
}

/// Completion of one performance, always derived from current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoringStatus {
    pub performance_id: Uuid,
    pub total_judges: u32,
    pub scored_judges: u32,
    pub pending_judge_ids: Vec<Uuid>,
    pub is_fully_scored: bool,
}

impl ScoringStatus {
    /// Only scores from judges on `roster` count towards completion.
    pub fn compute(performance_id: Uuid, roster: &[Uuid], scored_by: &[Uuid]) -> Self {
        let mut roster: Vec<Uuid> = roster.to_vec();
        roster.sort_unstable();
        roster.dedup();

        let (scored, pending): (Vec<Uuid>, Vec<Uuid>) = roster
            .iter()
            .partition(|judge_id| scored_by.contains(judge_id));

        let total_judges = roster.len() as u32;
        let scored_judges = scored.len() as u32;

        Self {
            performance_id,
            total_judges,
            scored_judges,
            pending_judge_ids: pending,
            is_fully_scored: total_judges > 0 && scored_judges == total_judges,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RankingEntry {
    pub performance_id: Uuid,
    pub item_number: Option<u32>,
    pub title: String,
    pub score_count: u32,
    pub total_points: u32,
    pub average_total: f64,
    pub scoring: ScoringStatus,
}

impl RankingEntry {
    pub fn new(
        performance_id: Uuid,
        item_number: Option<u32>,
        title: impl Into<String>,
        totals: &[u32],
        scoring: ScoringStatus,
    ) -> Self {
        let total_points: u32 = totals.iter().sum();
        let average_total = if totals.is_empty() {
            0.0
        } else {
            let raw = f64::from(total_points) / totals.len() as f64;
            (raw * 100.0).round() / 100.0
        };

        Self {
            performance_id,
            item_number,
            title: title.into(),
            score_count: totals.len() as u32,
            total_points,
            average_total,
            scoring,
        }
    }
}

/// Highest average first; ties fall back to running order.
pub fn sort_rankings(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| {
        b.average_total
            .partial_cmp(&a.average_total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.item_number
                    .unwrap_or(u32::MAX)
                    .cmp(&b.item_number.unwrap_or(u32::MAX))
            })
    });
}
