//! Entry fee calculation.
//!
//! Pure and stateless: called once when an entry is created, after which
//! only the resulting [`FeeQuote`] is stored. Amounts are whole rand.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// Charged once for every participant not yet registered in the event.
pub const REGISTRATION_FEE_PER_PARTICIPANT: u32 = 300;

/// Solo performance fee by the entrant's cumulative solo index within the
/// event. Index 0 is the first solo; anything past the table is free.
pub const SOLO_PACKAGE_FEES: [u32; 4] = [400, 350, 350, 350];

pub const DUET_RATE_PER_PERSON: u32 = 280;
pub const TRIO_RATE_PER_PERSON: u32 = 270;
pub const SMALL_GROUP_RATE_PER_PERSON: u32 = 220;
pub const LARGE_GROUP_RATE_PER_PERSON: u32 = 190;

/// Groups at or above this size are priced at the large-group rate.
pub const LARGE_GROUP_THRESHOLD: u32 = 10;

pub const MIN_GROUP_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Open,
}

impl MasteryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Open => "open",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PerformanceType {
    Solo,
    Duet,
    Trio,
    Group,
}

impl PerformanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Duet => "duet",
            Self::Trio => "trio",
            Self::Group => "group",
        }
    }

    fn accepts(&self, participants: u32) -> bool {
        match self {
            Self::Solo => participants == 1,
            Self::Duet => participants == 2,
            Self::Trio => participants == 3,
            Self::Group => participants >= MIN_GROUP_SIZE,
        }
    }

    fn rate_per_person(&self, participants: u32) -> u32 {
        match self {
            Self::Solo => 0,
            Self::Duet => DUET_RATE_PER_PERSON,
            Self::Trio => TRIO_RATE_PER_PERSON,
            Self::Group if participants >= LARGE_GROUP_THRESHOLD => LARGE_GROUP_RATE_PER_PERSON,
            Self::Group => SMALL_GROUP_RATE_PER_PERSON,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeeInput {
    pub mastery: MasteryLevel,
    pub performance_type: PerformanceType,
    pub participant_count: u32,
    /// Participants who have not paid registration in this event yet.
    pub new_participant_count: u32,
    /// For solos: how many solos this entrant already registered in the event.
    #[serde(default)]
    pub solo_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FeeQuote {
    pub registration_fee: u32,
    pub performance_fee: u32,
    pub total_fee: u32,
    pub breakdown: String,
}

pub fn solo_package_fee(previous_solos: u32) -> u32 {
    SOLO_PACKAGE_FEES
        .get(previous_solos as usize)
        .copied()
        .unwrap_or(0)
}

fn amount_overflow() -> CoreError {
    CoreError::Validation("fee amount out of range".to_string())
}

pub fn calculate_fee(input: &FeeInput) -> Result<FeeQuote, CoreError> {
    let kind = input.performance_type;
    if !kind.accepts(input.participant_count) {
        return Err(CoreError::Validation(format!(
            "{} entries cannot have {} participants",
            kind.as_str(),
            input.participant_count
        )));
    }
    if input.new_participant_count > input.participant_count {
        return Err(CoreError::Validation(
            "new participants exceed participant count".to_string(),
        ));
    }

    let registration_fee = REGISTRATION_FEE_PER_PARTICIPANT
        .checked_mul(input.new_participant_count)
        .ok_or_else(amount_overflow)?;
    let mut lines = vec![format!(
        "{} {} entry",
        input.mastery.as_str(),
        kind.as_str()
    )];
    lines.push(format!(
        "Registration: {} x R{} = R{}",
        input.new_participant_count, REGISTRATION_FEE_PER_PARTICIPANT, registration_fee
    ));

    let performance_fee = match kind {
        PerformanceType::Solo => {
            let fee = solo_package_fee(input.solo_count);
            let index = input.solo_count.checked_add(1).ok_or_else(amount_overflow)?;
            lines.push(format!("Solo #{}: R{}", index, fee));
            fee
        }
        _ => {
            let rate = kind.rate_per_person(input.participant_count);
            let fee = rate
                .checked_mul(input.participant_count)
                .ok_or_else(amount_overflow)?;
            lines.push(format!(
                "Performance: {} x R{} = R{}",
                input.participant_count, rate, fee
            ));
            fee
        }
    };

    let total_fee = registration_fee
        .checked_add(performance_fee)
        .ok_or_else(amount_overflow)?;
    lines.push(format!("Total: R{}", total_fee));

    Ok(FeeQuote {
        registration_fee,
        performance_fee,
        total_fee,
        breakdown: lines.join("\n"),
    })
}
