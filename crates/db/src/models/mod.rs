mod event;
mod performance;
mod score;

pub use event::*;
pub use performance::*;
pub use score::*;

use chrono::{DateTime, TimeZone, Utc};
use showrunner_core::PerformanceStatus;
use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|_| DbError::Corrupt(format!("invalid id {:?}", value)))
}

pub(crate) fn parse_ids(rows: Vec<(String,)>) -> Result<Vec<Uuid>, DbError> {
    rows.iter().map(|(id,)| parse_uuid(id)).collect()
}

pub(crate) fn parse_status(value: &str) -> Result<PerformanceStatus, DbError> {
    PerformanceStatus::parse(value)
        .ok_or_else(|| DbError::Corrupt(format!("invalid status {:?}", value)))
}

pub(crate) fn datetime_to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}
