use showrunner_core::{FeeQuote, Performance};

use super::{datetime_to_millis, millis_to_datetime, parse_status, parse_uuid};
use crate::error::DbError;

pub(crate) const PERFORMANCE_COLUMNS: &str = "id, event_id, item_number, status, \
    withdrawn_from_judging, title, participants, duration_seconds, media_ref, \
    registration_fee, performance_fee, total_fee, fee_breakdown, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PerformanceRow {
    pub id: String,
    pub event_id: String,
    pub item_number: Option<i64>,
    pub status: String,
    pub withdrawn_from_judging: bool,
    pub title: String,
    pub participants: String,
    pub duration_seconds: Option<i64>,
    pub media_ref: Option<String>,
    pub registration_fee: Option<i64>,
    pub performance_fee: Option<i64>,
    pub total_fee: Option<i64>,
    pub fee_breakdown: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PerformanceRow {
    pub fn into_domain(self) -> Result<Performance, DbError> {
        let fee = match (
            self.registration_fee,
            self.performance_fee,
            self.total_fee,
            self.fee_breakdown,
        ) {
            (Some(registration_fee), Some(performance_fee), Some(total_fee), breakdown) => {
                Some(FeeQuote {
                    registration_fee: registration_fee as u32,
                    performance_fee: performance_fee as u32,
                    total_fee: total_fee as u32,
                    breakdown: breakdown.unwrap_or_default(),
                })
            }
            _ => None,
        };

        Ok(Performance {
            id: parse_uuid(&self.id)?,
            event_id: parse_uuid(&self.event_id)?,
            item_number: self.item_number.map(|n| n as u32),
            status: parse_status(&self.status)?,
            withdrawn_from_judging: self.withdrawn_from_judging,
            title: self.title,
            participants: serde_json::from_str(&self.participants)?,
            duration_seconds: self.duration_seconds.map(|d| d as u32),
            media_ref: self.media_ref,
            fee,
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        })
    }

    pub fn try_from_domain(performance: &Performance) -> Result<Self, serde_json::Error> {
        let fee = performance.fee.as_ref();
        Ok(Self {
            id: performance.id.to_string(),
            event_id: performance.event_id.to_string(),
            item_number: performance.item_number.map(i64::from),
            status: performance.status.as_str().to_string(),
            withdrawn_from_judging: performance.withdrawn_from_judging,
            title: performance.title.clone(),
            participants: serde_json::to_string(&performance.participants)?,
            duration_seconds: performance.duration_seconds.map(i64::from),
            media_ref: performance.media_ref.clone(),
            registration_fee: fee.map(|f| i64::from(f.registration_fee)),
            performance_fee: fee.map(|f| i64::from(f.performance_fee)),
            total_fee: fee.map(|f| i64::from(f.total_fee)),
            fee_breakdown: fee.map(|f| f.breakdown.clone()),
            created_at: datetime_to_millis(performance.created_at),
            updated_at: datetime_to_millis(performance.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_row_round_trip_keeps_fee_verbatim() {
        let mut performance = Performance::new(Uuid::new_v4(), "Jazz Hands")
            .with_participants(vec!["Ava".to_string(), "Noah".to_string()]);
        performance.item_number = Some(3);
        performance.fee = Some(FeeQuote {
            registration_fee: 600,
            performance_fee: 560,
            total_fee: 1160,
            breakdown: "line one\nline two".to_string(),
        });

        let row = PerformanceRow::try_from_domain(&performance).unwrap();
        assert_eq!(row.participants, r#"["Ava","Noah"]"#);

        let back = row.into_domain().unwrap();
        assert_eq!(back.id, performance.id);
        assert_eq!(back.item_number, Some(3));
        assert_eq!(back.fee, performance.fee);
        assert_eq!(back.participants.len(), 2);
    }

    #[test]
    fn test_row_without_fee() {
        let performance = Performance::new(Uuid::new_v4(), "Tap Solo");
        let row = PerformanceRow::try_from_domain(&performance).unwrap();
        assert!(row.total_fee.is_none());
        assert!(row.into_domain().unwrap().fee.is_none());
    }

    #[test]
    fn test_corrupt_id_is_an_error() {
        let performance = Performance::new(Uuid::new_v4(), "Ballet");
        let mut row = PerformanceRow::try_from_domain(&performance).unwrap();
        row.event_id = "not-a-uuid".to_string();
        assert!(matches!(row.into_domain(), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let performance = Performance::new(Uuid::new_v4(), "Ballet");
        let mut row = PerformanceRow::try_from_domain(&performance).unwrap();
        row.status = "rehearsing".to_string();
        assert!(matches!(row.into_domain(), Err(DbError::Corrupt(_))));
    }
}
