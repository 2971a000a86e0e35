use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    ActiveBooking, Appointment, AppointmentStatus, BookingKind, FollowUpSession, FollowUpStatus,
};
use crate::store::{AppointmentFilter, SchedulingStore, StoreError};

#[derive(Default)]
struct Tables {
    appointments: HashMap<Uuid, Appointment>,
    follow_ups: HashMap<Uuid, FollowUpSession>,
}

impl Tables {
    fn active_bookings(&self, counselor_id: Uuid, date: NaiveDate, exclude_id: Option<Uuid>) -> Vec<ActiveBooking> {
        let appointments = self
            .appointments
            .values()
            .filter(|apt| apt.counselor_id == Some(counselor_id))
            .filter(|apt| apt.preferred_date == date && apt.status.occupies_time())
            .map(|apt| ActiveBooking {
                id: apt.id,
                kind: BookingKind::Appointment,
                counselor_id,
                date,
                time_range: apt.preferred_time,
            });

        let follow_ups = self
            .follow_ups
            .values()
            .filter(|session| session.counselor_id == counselor_id)
            .filter(|session| session.preferred_date == date && session.status == FollowUpStatus::Pending)
            .map(|session| ActiveBooking {
                id: session.id,
                kind: BookingKind::FollowUp,
                counselor_id,
                date,
                time_range: session.preferred_time,
            });

        let mut bookings: Vec<ActiveBooking> = appointments
            .chain(follow_ups)
            .filter(|booking| Some(booking.id) != exclude_id)
            .collect();
        bookings.sort_by_key(|booking| booking.time_range);
        bookings
    }

    fn ensure_free(&self, booking: &ActiveBooking) -> Result<(), StoreError> {
        let clash = self
            .active_bookings(booking.counselor_id, booking.date, Some(booking.id))
            .into_iter()
            .find(|other| other.time_range.overlaps(&booking.time_range));

        match clash {
            Some(other) => Err(StoreError::SlotTaken {
                conflicting_with: Some(other.id),
            }),
            None => Ok(()),
        }
    }

    fn check_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        match appointment.counselor_id {
            Some(counselor_id) if appointment.status.occupies_time() => self.ensure_free(&ActiveBooking {
                id: appointment.id,
                kind: BookingKind::Appointment,
                counselor_id,
                date: appointment.preferred_date,
                time_range: appointment.preferred_time,
            }),
            _ => Ok(()),
        }
    }

    fn check_follow_up(&self, session: &FollowUpSession) -> Result<(), StoreError> {
        let siblings = self
            .follow_ups
            .values()
            .filter(|other| other.parent_appointment_id == session.parent_appointment_id && other.id != session.id);

        for sibling in siblings {
            if sibling.sequence_number == session.sequence_number {
                return Err(StoreError::SequenceTaken {
                    parent_appointment_id: session.parent_appointment_id,
                    sequence_number: session.sequence_number,
                });
            }
            if sibling.status == FollowUpStatus::Pending && session.status == FollowUpStatus::Pending {
                return Err(StoreError::PendingFollowUpExists {
                    parent_appointment_id: session.parent_appointment_id,
                });
            }
        }

        if session.status == FollowUpStatus::Pending {
            self.ensure_free(&ActiveBooking {
                id: session.id,
                kind: BookingKind::FollowUp,
                counselor_id: session.counselor_id,
                date: session.preferred_date,
                time_range: session.preferred_time,
            })?;
        }
        Ok(())
    }
}

/// Process-local store. One mutex guards every table, so each check-and-write
/// is atomic with respect to concurrent requests.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    tables: Mutex<Tables>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.lock().await.appointments.get(&id).cloned())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check_appointment(appointment)?;
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .appointments
            .get(&appointment.id)
            .ok_or(StoreError::NotFound(appointment.id))?;
        if stored.status != expected_status {
            return Err(StoreError::StatusChanged {
                id: appointment.id,
                expected: expected_status.to_string(),
            });
        }
        tables.check_appointment(appointment)?;
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|apt| filter.student_id.map_or(true, |id| apt.student_id == id))
            .filter(|apt| filter.counselor_id.map_or(true, |id| apt.counselor_id == Some(id)))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            b.preferred_date
                .cmp(&a.preferred_date)
                .then(b.preferred_time.cmp(&a.preferred_time))
        });
        Ok(appointments)
    }

    async fn get_follow_up(&self, id: Uuid) -> Result<Option<FollowUpSession>, StoreError> {
        Ok(self.tables.lock().await.follow_ups.get(&id).cloned())
    }

    async fn insert_follow_up(&self, session: &FollowUpSession) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check_follow_up(session)?;
        tables.follow_ups.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_follow_up(
        &self,
        session: &FollowUpSession,
        expected_status: FollowUpStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .follow_ups
            .get(&session.id)
            .ok_or(StoreError::NotFound(session.id))?;
        if stored.status != expected_status {
            return Err(StoreError::StatusChanged {
                id: session.id,
                expected: expected_status.to_string(),
            });
        }
        tables.check_follow_up(session)?;
        tables.follow_ups.insert(session.id, session.clone());
        Ok(())
    }

    async fn list_follow_ups(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, StoreError> {
        let tables = self.tables.lock().await;
        let mut sessions: Vec<FollowUpSession> = tables
            .follow_ups
            .values()
            .filter(|session| session.parent_appointment_id == parent_appointment_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.sequence_number);
        Ok(sessions)
    }

    async fn active_bookings(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<ActiveBooking>, StoreError> {
        Ok(self.tables.lock().await.active_bookings(counselor_id, date, exclude_id))
    }
}
