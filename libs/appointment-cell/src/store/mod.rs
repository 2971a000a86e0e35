mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ActiveBooking, Appointment, AppointmentError, AppointmentStatus, FollowUpSession, FollowUpStatus,
};

pub use memory::InMemorySchedulingStore;
pub use supabase::SupabaseSchedulingStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write would overlap another active booking of the same counselor.
    #[error("Time slot already taken")]
    SlotTaken { conflicting_with: Option<Uuid> },

    #[error("Appointment {parent_appointment_id} already has a pending follow-up session")]
    PendingFollowUpExists { parent_appointment_id: Uuid },

    #[error("Follow-up sequence number {sequence_number} already used for appointment {parent_appointment_id}")]
    SequenceTaken {
        parent_appointment_id: Uuid,
        sequence_number: u32,
    },

    #[error("Record {0} not found")]
    NotFound(Uuid),

    /// A conditional update found the row in a different status than the caller read.
    #[error("Record {id} is no longer {expected}")]
    StatusChanged { id: Uuid, expected: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppointmentError::NotFound(format!("Record {}", id)),
            StoreError::PendingFollowUpExists { parent_appointment_id } => AppointmentError::PendingFollowUpExists {
                parent_appointment_id,
                pending_session_id: None,
            },
            other => AppointmentError::Persistence(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub student_id: Option<Uuid>,
    pub counselor_id: Option<Uuid>,
}

/// Persistence for appointments and follow-up sessions.
///
/// Inserts and updates are the serialization point for concurrent bookings:
/// an implementation must re-check overlap against the counselor's active
/// bookings atomically with the write (lock, transaction or exclusion
/// constraint) and fail with [`StoreError::SlotTaken`]. Follow-up inserts
/// must likewise enforce one pending session per parent and unique
/// sequence numbers.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    /// Writes only if the stored row is still in `expected_status`, else [`StoreError::StatusChanged`].
    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<(), StoreError>;

    /// Newest preferred date first.
    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn get_follow_up(&self, id: Uuid) -> Result<Option<FollowUpSession>, StoreError>;

    async fn insert_follow_up(&self, session: &FollowUpSession) -> Result<(), StoreError>;

    /// Same compare-and-set contract as [`SchedulingStore::update_appointment`].
    async fn update_follow_up(
        &self,
        session: &FollowUpSession,
        expected_status: FollowUpStatus,
    ) -> Result<(), StoreError>;

    /// Sessions of one parent ordered by sequence number.
    async fn list_follow_ups(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, StoreError>;

    /// Pending/approved appointments and pending follow-ups of the counselor on `date`.
    async fn active_bookings(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<ActiveBooking>, StoreError>;
}
