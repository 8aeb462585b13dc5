use showrunner_core::{Score, ScoreDimensions};

use super::{datetime_to_millis, millis_to_datetime, parse_uuid};
use crate::error::DbError;

pub(crate) const SCORE_COLUMNS: &str =
    "performance_id, judge_id, dim1, dim2, dim3, dim4, dim5, total, comments, submitted_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub performance_id: String,
    pub judge_id: String,
    pub dim1: i64,
    pub dim2: i64,
    pub dim3: i64,
    pub dim4: i64,
    pub dim5: i64,
    pub total: i64,
    pub comments: Option<String>,
    pub submitted_at: i64,
}

impl ScoreRow {
    /// Rows are guarded by CHECK constraints, so a dimension that fails
    /// validation here means the table was edited by hand.
    pub fn into_domain(self) -> Result<Score, DbError> {
        let dimensions = ScoreDimensions::try_from_values(&[
            self.dim1, self.dim2, self.dim3, self.dim4, self.dim5,
        ])
        .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(Score {
            performance_id: parse_uuid(&self.performance_id)?,
            judge_id: parse_uuid(&self.judge_id)?,
            dimensions,
            total: self.total as u32,
            comments: self.comments,
            submitted_at: millis_to_datetime(self.submitted_at),
        })
    }
}

impl From<&Score> for ScoreRow {
    fn from(score: &Score) -> Self {
        let [dim1, dim2, dim3, dim4, dim5] = score.dimensions.values().map(i64::from);
        Self {
            performance_id: score.performance_id.to_string(),
            judge_id: score.judge_id.to_string(),
            dim1,
            dim2,
            dim3,
            dim4,
            dim5,
            total: i64::from(score.total),
            comments: score.comments.clone(),
            submitted_at: datetime_to_millis(score.submitted_at),
        }
    }
}
