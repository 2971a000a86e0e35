// libs/appointment-cell/src/services/workflow.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_models::TimeRange;
use shared_utils::Clock;

use crate::models::{
    required_text, ActiveBooking, Appointment, AppointmentDraft, AppointmentEdit, AppointmentError,
    AppointmentStatus, BookingOutcome, ConflictQuery, ConflictResult, FollowUpDraft, FollowUpEdit,
    FollowUpSession, SchedulingState,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::follow_up::FollowUpChainService;
use crate::services::lifecycle::{AppointmentAction, AppointmentLifecycleService};
use crate::services::notification::{dispatch, Notification, NotificationKind, NotificationSink};
use crate::store::{AppointmentFilter, SchedulingStore, StoreError};

/// Entry point for every booking operation the HTTP layer exposes.
pub struct AppointmentWorkflow {
    store: Arc<dyn SchedulingStore>,
    conflict_service: Arc<ConflictDetectionService>,
    follow_ups: FollowUpChainService,
    lifecycle: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
}

impl AppointmentWorkflow {
    pub fn new(state: &SchedulingState) -> Self {
        let conflict_service = Arc::new(ConflictDetectionService::new(
            Arc::clone(&state.availability_store),
            Arc::clone(&state.store),
        ));

        Self {
            store: Arc::clone(&state.store),
            follow_ups: FollowUpChainService::new(state, Arc::clone(&conflict_service)),
            conflict_service,
            lifecycle: AppointmentLifecycleService::new(),
            clock: Arc::clone(&state.clock),
            notifier: Arc::clone(&state.notifier),
        }
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    #[instrument(skip(self, draft), fields(student = %draft.student_id))]
    pub async fn create_appointment(
        &self,
        draft: AppointmentDraft,
    ) -> Result<BookingOutcome<Appointment>, AppointmentError> {
        self.ensure_not_in_past(&draft.preferred_date)?;

        let conflict = self
            .conflict_service
            .check_conflicts(draft.counselor_id, draft.preferred_date, &draft.preferred_time, None)
            .await?;
        if conflict.has_conflict {
            return Ok(BookingOutcome::Conflict(conflict));
        }

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            student_id: draft.student_id,
            counselor_id: draft.counselor_id,
            preferred_date: draft.preferred_date,
            preferred_time: draft.preferred_time,
            consultation_type: draft.consultation_type,
            method_type: draft.method_type,
            purpose: draft.purpose,
            description: draft.description,
            status: AppointmentStatus::Pending,
            cancellation_reason: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_appointment(&appointment).await {
            return booking_race(e);
        }

        info!(
            "Appointment {} booked for {} {} (counselor: {:?})",
            appointment.id, appointment.preferred_date, appointment.preferred_time, appointment.counselor_id
        );
        self.notify_booking(&appointment, NotificationKind::AppointmentBooked, "New appointment request")
            .await;

        Ok(BookingOutcome::Booked(appointment))
    }

    #[instrument(skip(self, edit))]
    pub async fn edit_appointment(
        &self,
        appointment_id: Uuid,
        edit: AppointmentEdit,
    ) -> Result<BookingOutcome<Appointment>, AppointmentError> {
        let mut appointment = self.get_appointment(appointment_id).await?;
        let read_status = appointment.status;
        self.lifecycle.apply(read_status, AppointmentAction::Edit)?;
        self.ensure_not_in_past(&edit.preferred_date)?;

        let conflict = self
            .conflict_service
            .check_conflicts(edit.counselor_id, edit.preferred_date, &edit.preferred_time, Some(appointment.id))
            .await?;
        if conflict.has_conflict {
            return Ok(BookingOutcome::Conflict(conflict));
        }

        appointment.counselor_id = edit.counselor_id;
        appointment.preferred_date = edit.preferred_date;
        appointment.preferred_time = edit.preferred_time;
        appointment.consultation_type = edit.consultation_type;
        appointment.method_type = edit.method_type;
        appointment.purpose = edit.purpose;
        appointment.description = edit.description;
        appointment.updated_at = self.clock.now();

        match self.store.update_appointment(&appointment, read_status).await {
            Ok(()) => {}
            Err(StoreError::StatusChanged { .. }) => {
                return Err(self.stale_transition(appointment.id, AppointmentAction::Edit).await);
            }
            Err(e) => return booking_race(e),
        }

        info!(
            "Appointment {} moved to {} {}",
            appointment.id, appointment.preferred_date, appointment.preferred_time
        );
        self.notify_booking(&appointment, NotificationKind::AppointmentUpdated, "Appointment details updated")
            .await;

        Ok(BookingOutcome::Booked(appointment))
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid, reason: &str) -> Result<Appointment, AppointmentError> {
        let reason = required_text("reason", reason)?;
        let mut appointment = self.get_appointment(appointment_id).await?;
        let read_status = appointment.status;
        appointment.status = self.lifecycle.apply(read_status, AppointmentAction::Cancel)?;
        appointment.cancellation_reason = Some(reason);
        self.save_transition(&mut appointment, read_status, AppointmentAction::Cancel).await?;

        self.notify_booking(&appointment, NotificationKind::AppointmentCancelled, "Appointment cancelled")
            .await;
        Ok(appointment)
    }

    pub async fn approve(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.get_appointment(appointment_id).await?;
        let read_status = appointment.status;
        appointment.status = self.lifecycle.apply(read_status, AppointmentAction::Approve)?;
        self.save_transition(&mut appointment, read_status, AppointmentAction::Approve).await?;

        self.notify_student(&appointment, NotificationKind::AppointmentApproved, "Your appointment was approved")
            .await;
        Ok(appointment)
    }

    pub async fn reject(&self, appointment_id: Uuid, reason: &str) -> Result<Appointment, AppointmentError> {
        let reason = required_text("reason", reason)?;
        let mut appointment = self.get_appointment(appointment_id).await?;
        let read_status = appointment.status;
        appointment.status = self.lifecycle.apply(read_status, AppointmentAction::Reject)?;
        appointment.rejection_reason = Some(reason);
        self.save_transition(&mut appointment, read_status, AppointmentAction::Reject).await?;

        self.notify_student(&appointment, NotificationKind::AppointmentRejected, "Your appointment was rejected")
            .await;
        Ok(appointment)
    }

    /// Completing is what makes an appointment eligible to own follow-ups.
    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.get_appointment(appointment_id).await?;
        let read_status = appointment.status;
        appointment.status = self.lifecycle.apply(read_status, AppointmentAction::Complete)?;
        self.save_transition(&mut appointment, read_status, AppointmentAction::Complete).await?;

        self.notify_student(&appointment, NotificationKind::AppointmentCompleted, "Your appointment was completed")
            .await;
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))
    }

    pub async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self
            .store
            .list_appointments(AppointmentFilter {
                student_id: Some(student_id),
                counselor_id: None,
            })
            .await?;
        debug!("Found {} appointments for student {}", appointments.len(), student_id);
        Ok(appointments)
    }

    pub async fn list_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self
            .store
            .list_appointments(AppointmentFilter {
                student_id: None,
                counselor_id: Some(counselor_id),
            })
            .await?;
        debug!("Found {} appointments for counselor {}", appointments.len(), counselor_id);
        Ok(appointments)
    }

    // ==========================================================================
    // AVAILABILITY QUERIES
    // ==========================================================================

    pub async fn check_conflict(&self, query: &ConflictQuery) -> Result<ConflictResult, AppointmentError> {
        self.conflict_service.check(query).await
    }

    pub async fn available_counselors(
        &self,
        date: NaiveDate,
        time_range: &TimeRange,
    ) -> Result<Vec<Uuid>, AppointmentError> {
        self.conflict_service.available_counselors(date, time_range).await
    }

    pub async fn booked_ranges(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<ActiveBooking>, AppointmentError> {
        self.conflict_service.booked_ranges(counselor_id, date).await
    }

    // ==========================================================================
    // FOLLOW-UP SESSIONS
    // ==========================================================================

    pub async fn list_follow_ups(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, AppointmentError> {
        self.follow_ups.list_sessions(parent_appointment_id).await
    }

    pub async fn create_follow_up(
        &self,
        draft: FollowUpDraft,
    ) -> Result<BookingOutcome<FollowUpSession>, AppointmentError> {
        self.follow_ups.create_next(draft).await
    }

    pub async fn edit_follow_up(
        &self,
        session_id: Uuid,
        edit: FollowUpEdit,
    ) -> Result<BookingOutcome<FollowUpSession>, AppointmentError> {
        self.follow_ups.edit_session(session_id, edit).await
    }

    pub async fn complete_follow_up(&self, session_id: Uuid) -> Result<FollowUpSession, AppointmentError> {
        self.follow_ups.complete_session(session_id).await
    }

    pub async fn cancel_follow_up(&self, session_id: Uuid, reason: &str) -> Result<FollowUpSession, AppointmentError> {
        self.follow_ups.cancel_session(session_id, reason).await
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    /// Writes a status change only if nobody moved the appointment since it was read.
    async fn save_transition(
        &self,
        appointment: &mut Appointment,
        read_status: AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<(), AppointmentError> {
        appointment.updated_at = self.clock.now();
        match self.store.update_appointment(appointment, read_status).await {
            Ok(()) => {}
            Err(StoreError::StatusChanged { .. }) => return Err(self.stale_transition(appointment.id, action).await),
            Err(e) => return Err(e.into()),
        }
        info!("Appointment {} is now {}", appointment.id, appointment.status);
        Ok(())
    }

    /// The error for a write that lost a race against another status change.
    async fn stale_transition(&self, appointment_id: Uuid, action: AppointmentAction) -> AppointmentError {
        match self.get_appointment(appointment_id).await {
            Ok(current) => {
                warn!(
                    "Appointment {} changed to {} before {} could be saved",
                    appointment_id,
                    current.status,
                    action.verb()
                );
                AppointmentError::InvalidTransition {
                    entity: "appointment",
                    from: current.status.to_string(),
                    action: action.verb(),
                }
            }
            Err(e) => e,
        }
    }

    fn ensure_not_in_past(&self, date: &NaiveDate) -> Result<(), AppointmentError> {
        let today = self.clock.today();
        if *date < today {
            debug!("Rejected appointment date {} before {}", date, today);
            return Err(AppointmentError::InvalidInput(format!(
                "preferred date {} is in the past",
                date
            )));
        }
        Ok(())
    }

    /// Booking-side changes go to the counselor when one was chosen.
    async fn notify_booking(&self, appointment: &Appointment, kind: NotificationKind, message: &str) {
        let recipient_id = appointment.counselor_id.unwrap_or(appointment.student_id);
        self.send(recipient_id, appointment, kind, message).await;
    }

    async fn notify_student(&self, appointment: &Appointment, kind: NotificationKind, message: &str) {
        self.send(appointment.student_id, appointment, kind, message).await;
    }

    async fn send(&self, recipient_id: Uuid, appointment: &Appointment, kind: NotificationKind, message: &str) {
        dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient_id,
                kind,
                related_id: appointment.id,
                message: format!(
                    "{} for {} {}",
                    message, appointment.preferred_date, appointment.preferred_time
                ),
            },
        )
        .await;
    }
}

/// A guarded write that lost the race is still a conflict, not a failure.
fn booking_race(err: StoreError) -> Result<BookingOutcome<Appointment>, AppointmentError> {
    match err {
        StoreError::SlotTaken { conflicting_with } => {
            warn!("Booking lost a concurrent race for the same slot");
            Ok(BookingOutcome::Conflict(ConflictResult::double_booked(conflicting_with)))
        }
        other => Err(other.into()),
    }
}
