// libs/appointment-cell/src/models.rs
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use counselor_cell::{AvailabilityError, AvailabilityStore};
use shared_models::error::AppError;
use shared_models::{parse_date, ScheduleParseError, TimeRange};
use shared_utils::Clock;

use crate::services::notification::NotificationSink;
use crate::store::SchedulingStore;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub student_id: Uuid,
    /// `None` means the student had no counselor preference.
    pub counselor_id: Option<Uuid>,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub method_type: MethodType,
    pub purpose: String,
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Only active commitments block a counselor's time.
    pub fn occupies_time(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    #[serde(alias = "individual_consultation", alias = "Individual Consultation")]
    Individual,

    #[serde(alias = "group_consultation", alias = "Group Consultation")]
    Group,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MethodType {
    #[serde(alias = "in-person", alias = "face_to_face", alias = "In-person")]
    InPerson,

    #[serde(alias = "virtual", alias = "Online")]
    Online,
}

// ==============================================================================
// FOLLOW-UP SESSION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpSession {
    pub id: Uuid,
    pub parent_appointment_id: Uuid,
    pub student_id: Uuid,
    pub counselor_id: Uuid,
    /// Starts at 1 per parent, strictly increasing, never reused.
    pub sequence_number: u32,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub status: FollowUpStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Pending,
    Completed,
    Cancelled,
}

impl FollowUpStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FollowUpStatus::Pending)
    }
}

impl fmt::Display for FollowUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUpStatus::Pending => write!(f, "pending"),
            FollowUpStatus::Completed => write!(f, "completed"),
            FollowUpStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    OutsideAvailability,
    DoubleBooked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictResult {
    pub has_conflict: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub conflict_type: Option<ConflictType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conflicting_with: Option<Uuid>,
}

impl ConflictResult {
    pub fn no_conflict() -> Self {
        Self {
            has_conflict: false,
            conflict_type: None,
            conflicting_with: None,
        }
    }

    pub fn outside_availability() -> Self {
        Self {
            has_conflict: true,
            conflict_type: Some(ConflictType::OutsideAvailability),
            conflicting_with: None,
        }
    }

    /// `conflicting_with` is unknown when the storage constraint, not the checker, caught the overlap.
    pub fn double_booked(conflicting_with: Option<Uuid>) -> Self {
        Self {
            has_conflict: true,
            conflict_type: Some(ConflictType::DoubleBooked),
            conflicting_with,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.conflict_type {
            None => "The selected time is available",
            Some(ConflictType::OutsideAvailability) => "The counselor is not available at the selected time",
            Some(ConflictType::DoubleBooked) => "The counselor already has a booking at the selected time",
        }
    }
}

/// Ephemeral checker input; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
    pub counselor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time_range: TimeRange,
    pub exclude_id: Option<Uuid>,
}

/// A booking that currently occupies counselor time: a pending/approved
/// appointment or a pending follow-up session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveBooking {
    pub id: Uuid,
    pub kind: BookingKind,
    pub counselor_id: Uuid,
    pub date: NaiveDate,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Appointment,
    FollowUp,
}

/// Result of a booking-shaped operation. A conflict is an expected outcome
/// the caller shows to the user, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome<T> {
    Booked(T),
    Conflict(ConflictResult),
}

impl<T> BookingOutcome<T> {
    pub fn booked(self) -> Option<T> {
        match self {
            BookingOutcome::Booked(value) => Some(value),
            BookingOutcome::Conflict(_) => None,
        }
    }

    pub fn conflict(&self) -> Option<&ConflictResult> {
        match self {
            BookingOutcome::Booked(_) => None,
            BookingOutcome::Conflict(result) => Some(result),
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(self, BookingOutcome::Booked(_))
    }
}

// ==============================================================================
// VALIDATED INPUTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub student_id: Uuid,
    pub counselor_id: Option<Uuid>,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub method_type: MethodType,
    pub purpose: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentEdit {
    pub counselor_id: Option<Uuid>,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub method_type: MethodType,
    pub purpose: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpDraft {
    pub parent_appointment_id: Uuid,
    pub counselor_id: Uuid,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub description: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpEdit {
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeRange,
    pub consultation_type: ConsultationType,
    pub description: Option<String>,
    pub reason: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub student_id: Uuid,
    pub counselor_id: Option<Uuid>,
    pub preferred_date: String,
    pub preferred_time: String,
    pub consultation_type: ConsultationType,
    pub method_type: MethodType,
    pub purpose: String,
    pub description: Option<String>,
}

impl BookAppointmentRequest {
    pub fn parse(&self) -> Result<AppointmentDraft, AppointmentError> {
        Ok(AppointmentDraft {
            student_id: self.student_id,
            counselor_id: self.counselor_id,
            preferred_date: parse_date(&self.preferred_date)?,
            preferred_time: self.preferred_time.parse()?,
            consultation_type: self.consultation_type,
            method_type: self.method_type,
            purpose: required_text("purpose", &self.purpose)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub counselor_id: Option<Uuid>,
    pub preferred_date: String,
    pub preferred_time: String,
    pub consultation_type: ConsultationType,
    pub method_type: MethodType,
    pub purpose: String,
    pub description: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn parse(&self) -> Result<AppointmentEdit, AppointmentError> {
        Ok(AppointmentEdit {
            counselor_id: self.counselor_id,
            preferred_date: parse_date(&self.preferred_date)?,
            preferred_time: self.preferred_time.parse()?,
            consultation_type: self.consultation_type,
            method_type: self.method_type,
            purpose: required_text("purpose", &self.purpose)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub counselor_id: Option<Uuid>,
    pub date: String,
    pub time: String,
    pub exclude_id: Option<Uuid>,
}

impl ConflictCheckQuery {
    pub fn parse(&self) -> Result<ConflictQuery, AppointmentError> {
        Ok(ConflictQuery {
            counselor_id: self.counselor_id,
            date: parse_date(&self.date)?,
            time_range: self.time.parse()?,
            exclude_id: self.exclude_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableCounselorsQuery {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedRangesQuery {
    pub counselor_id: Uuid,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFollowUpRequest {
    pub parent_appointment_id: Uuid,
    pub counselor_id: Uuid,
    pub preferred_date: String,
    pub preferred_time: String,
    pub consultation_type: ConsultationType,
    pub description: Option<String>,
    pub reason: Option<String>,
}

impl CreateFollowUpRequest {
    pub fn parse(&self) -> Result<FollowUpDraft, AppointmentError> {
        Ok(FollowUpDraft {
            parent_appointment_id: self.parent_appointment_id,
            counselor_id: self.counselor_id,
            preferred_date: parse_date(&self.preferred_date)?,
            preferred_time: self.preferred_time.parse()?,
            consultation_type: self.consultation_type,
            description: optional_text(self.description.as_deref()),
            reason: optional_text(self.reason.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFollowUpRequest {
    pub id: Uuid,
    pub preferred_date: String,
    pub preferred_time: String,
    pub consultation_type: ConsultationType,
    pub description: Option<String>,
    pub reason: Option<String>,
}

impl EditFollowUpRequest {
    pub fn parse(&self) -> Result<FollowUpEdit, AppointmentError> {
        Ok(FollowUpEdit {
            preferred_date: parse_date(&self.preferred_date)?,
            preferred_time: self.preferred_time.parse()?,
            consultation_type: self.consultation_type,
            description: optional_text(self.description.as_deref()),
            reason: optional_text(self.reason.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteFollowUpRequest {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelFollowUpRequest {
    pub id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpSessionsQuery {
    pub parent_appointment_id: Uuid,
}

/// Trimmed, non-empty text or `InvalidInput`.
pub fn required_text(field: &str, value: &str) -> Result<String, AppointmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppointmentError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

// ==============================================================================
// SHARED STATE
// ==============================================================================

/// Collaborators every scheduling request runs against.
#[derive(Clone)]
pub struct SchedulingState {
    pub availability_store: Arc<dyn AvailabilityStore>,
    pub store: Arc<dyn SchedulingStore>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn NotificationSink>,
}

// ==============================================================================
// ERROR MODELS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Follow-up not allowed: {0}")]
    InvalidParentState(String),

    #[error("Appointment {parent_appointment_id} already has a pending follow-up session")]
    PendingFollowUpExists {
        parent_appointment_id: Uuid,
        pending_session_id: Option<Uuid>,
    },

    #[error("Cannot {action} {entity} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<ScheduleParseError> for AppointmentError {
    fn from(err: ScheduleParseError) -> Self {
        AppointmentError::InvalidInput(err.to_string())
    }
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidInput(msg) | AvailabilityError::InvalidAvailability(msg) => {
                AppointmentError::InvalidInput(msg)
            }
            AvailabilityError::Persistence(msg) => AppointmentError::Persistence(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::InvalidInput(msg) => AppError::BadRequest(msg),
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidParentState(_)
            | AppointmentError::PendingFollowUpExists { .. }
            | AppointmentError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::Persistence(msg) => AppError::Database(msg),
        }
    }
}
