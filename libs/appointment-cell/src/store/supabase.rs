use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{
    ActiveBooking, Appointment, AppointmentStatus, BookingKind, FollowUpSession, FollowUpStatus,
};
use crate::store::{AppointmentFilter, SchedulingStore, StoreError};

/// Constraint names from the scheduling schema. Overlap across both booking
/// tables is enforced by an `EXCLUDE USING gist` constraint on the
/// trigger-maintained `counselor_bookings` table.
const OVERLAP_CONSTRAINT: &str = "counselor_bookings_no_overlap";
const PENDING_FOLLOW_UP_INDEX: &str = "follow_up_sessions_one_pending_per_parent";
const SEQUENCE_KEY: &str = "follow_up_sessions_parent_sequence_key";

pub struct SupabaseSchedulingStore {
    supabase: Arc<SupabaseClient>,
    service_token: String,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_token: config.supabase_service_token.clone(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(&self.service_token), None)
            .await
            .map_err(backend)?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| StoreError::Backend(format!("Failed to parse rows: {}", e)))
    }

    /// `when_empty` is what an empty representation means: the row is gone for a plain
    /// write, or its status moved on for a conditional update.
    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Value,
        id: Uuid,
        when_empty: StoreError,
    ) -> Result<(), StoreError> {
        let written: Vec<Value> = self
            .supabase
            .request_with_headers(
                method,
                path,
                Some(&self.service_token),
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| constraint_error(e, id))?;

        if written.is_empty() {
            return Err(when_empty);
        }
        Ok(())
    }
}

fn backend(err: DatabaseError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn constraint_error(err: DatabaseError, id: Uuid) -> StoreError {
    match err {
        DatabaseError::Conflict(body) => {
            warn!("Write of {} rejected by constraint: {}", id, body);
            if body.contains(PENDING_FOLLOW_UP_INDEX) {
                // parent id is not echoed back; the caller re-reads the chain if it needs it
                StoreError::PendingFollowUpExists { parent_appointment_id: id }
            } else if body.contains(SEQUENCE_KEY) {
                StoreError::SequenceTaken {
                    parent_appointment_id: id,
                    sequence_number: 0,
                }
            } else if body.contains(OVERLAP_CONSTRAINT) {
                StoreError::SlotTaken { conflicting_with: None }
            } else {
                StoreError::Backend(body)
            }
        }
        other => backend(other),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        Ok(self.fetch::<Appointment>(&path).await?.into_iter().next())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        debug!("Inserting appointment {}", appointment.id);
        self.write(
            Method::POST,
            "/rest/v1/appointments",
            to_json(appointment)?,
            appointment.id,
            StoreError::NotFound(appointment.id),
        )
        .await
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment.id, expected_status
        );
        let stale = StoreError::StatusChanged {
            id: appointment.id,
            expected: expected_status.to_string(),
        };
        self.write(Method::PATCH, &path, to_json(appointment)?, appointment.id, stale)
            .await
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = Vec::new();
        if let Some(student_id) = filter.student_id {
            query_parts.push(format!("student_id=eq.{}", student_id));
        }
        if let Some(counselor_id) = filter.counselor_id {
            query_parts.push(format!("counselor_id=eq.{}", counselor_id));
        }
        query_parts.push("order=preferred_date.desc,preferred_time.desc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        self.fetch(&path).await
    }

    async fn get_follow_up(&self, id: Uuid) -> Result<Option<FollowUpSession>, StoreError> {
        let path = format!("/rest/v1/follow_up_sessions?id=eq.{}", id);
        Ok(self.fetch::<FollowUpSession>(&path).await?.into_iter().next())
    }

    async fn insert_follow_up(&self, session: &FollowUpSession) -> Result<(), StoreError> {
        debug!(
            "Inserting follow-up {} (#{}) for appointment {}",
            session.id, session.sequence_number, session.parent_appointment_id
        );
        self.write(
            Method::POST,
            "/rest/v1/follow_up_sessions",
            to_json(session)?,
            session.id,
            StoreError::NotFound(session.id),
        )
        .await
            .map_err(|e| match e {
                StoreError::PendingFollowUpExists { .. } => StoreError::PendingFollowUpExists {
                    parent_appointment_id: session.parent_appointment_id,
                },
                StoreError::SequenceTaken { .. } => StoreError::SequenceTaken {
                    parent_appointment_id: session.parent_appointment_id,
                    sequence_number: session.sequence_number,
                },
                other => other,
            })
    }

    async fn update_follow_up(
        &self,
        session: &FollowUpSession,
        expected_status: FollowUpStatus,
    ) -> Result<(), StoreError> {
        let path = format!(
            "/rest/v1/follow_up_sessions?id=eq.{}&status=eq.{}",
            session.id, expected_status
        );
        let stale = StoreError::StatusChanged {
            id: session.id,
            expected: expected_status.to_string(),
        };
        self.write(Method::PATCH, &path, to_json(session)?, session.id, stale).await
    }

    async fn list_follow_ups(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, StoreError> {
        let path = format!(
            "/rest/v1/follow_up_sessions?parent_appointment_id=eq.{}&order=sequence_number.asc",
            parent_appointment_id
        );
        self.fetch(&path).await
    }

    async fn active_bookings(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<ActiveBooking>, StoreError> {
        let exclude = exclude_id
            .map(|id| format!("&id=neq.{}", id))
            .unwrap_or_default();

        let appointments: Vec<Appointment> = self
            .fetch(&format!(
                "/rest/v1/appointments?counselor_id=eq.{}&preferred_date=eq.{}&status=in.(pending,approved){}",
                counselor_id, date, exclude
            ))
            .await?;

        let follow_ups: Vec<FollowUpSession> = self
            .fetch(&format!(
                "/rest/v1/follow_up_sessions?counselor_id=eq.{}&preferred_date=eq.{}&status=eq.pending{}",
                counselor_id, date, exclude
            ))
            .await?;

        let mut bookings: Vec<ActiveBooking> = appointments
            .into_iter()
            .filter(|apt| apt.status.occupies_time())
            .map(|apt| ActiveBooking {
                id: apt.id,
                kind: BookingKind::Appointment,
                counselor_id,
                date,
                time_range: apt.preferred_time,
            })
            .chain(follow_ups.into_iter().map(|session| ActiveBooking {
                id: session.id,
                kind: BookingKind::FollowUp,
                counselor_id,
                date,
                time_range: session.preferred_time,
            }))
            .collect();
        bookings.sort_by_key(|booking| booking.time_range);
        Ok(bookings)
    }
}
