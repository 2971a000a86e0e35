// libs/counselor-cell/src/models.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::{ScheduleParseError, TimeRange};

use crate::store::AvailabilityStore;

// ==============================================================================
// CORE AVAILABILITY MODELS
// ==============================================================================

/// One recurring weekly window in which a counselor takes bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day_of_week: Weekday,
    pub time_range: TimeRange,
}

impl AvailabilitySlot {
    pub fn new(day_of_week: Weekday, time_range: TimeRange) -> Self {
        Self { day_of_week, time_range }
    }
}

/// Full English day name, the form stored in `counselor_availability.day_of_week`.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn parse_day(raw: &str) -> Result<Weekday, AvailabilityError> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| AvailabilityError::InvalidInput(format!("Unknown day of week '{}'", raw)))
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub counselor_id: Uuid,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceDayRequest {
    pub time_slots: Vec<String>,
}

impl ReplaceDayRequest {
    pub fn parse(&self) -> Result<Vec<TimeRange>, AvailabilityError> {
        parse_slots(&self.time_slots)
    }
}

/// Whole-week replacement; days missing from `days` end up with no availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceWeekRequest {
    pub days: BTreeMap<String, Vec<String>>,
}

impl ReplaceWeekRequest {
    pub fn parse(&self) -> Result<Vec<(Weekday, Vec<TimeRange>)>, AvailabilityError> {
        self.days
            .iter()
            .map(|(day, slots)| Ok((parse_day(day)?, parse_slots(slots)?)))
            .collect()
    }
}

fn parse_slots(raw: &[String]) -> Result<Vec<TimeRange>, AvailabilityError> {
    raw.iter()
        .map(|slot| slot.parse::<TimeRange>().map_err(AvailabilityError::from))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAvailabilityResponse {
    pub counselor_id: Uuid,
    pub date: Option<String>,
    pub day_of_week: String,
    pub time_slots: Vec<String>,
}

/// Shared state for the counselor routes.
#[derive(Clone)]
pub struct CounselorState {
    pub availability_store: Arc<dyn AvailabilityStore>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<ScheduleParseError> for AvailabilityError {
    fn from(err: ScheduleParseError) -> Self {
        match err {
            ScheduleParseError::EmptyRange { .. } => AvailabilityError::InvalidAvailability(err.to_string()),
            _ => AvailabilityError::InvalidInput(err.to_string()),
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidInput(msg) => AppError::BadRequest(msg),
            AvailabilityError::InvalidAvailability(msg) => AppError::ValidationError(msg),
            AvailabilityError::Persistence(msg) => AppError::Database(msg),
        }
    }
}
