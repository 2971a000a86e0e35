// libs/appointment-cell/src/services/follow_up.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_utils::Clock;

use crate::models::{
    required_text, AppointmentError, BookingOutcome, ConflictResult, FollowUpDraft, FollowUpEdit,
    FollowUpSession, FollowUpStatus, SchedulingState,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::{AppointmentLifecycleService, FollowUpAction};
use crate::services::notification::{dispatch, Notification, NotificationKind, NotificationSink};
use crate::store::{SchedulingStore, StoreError};

/// The ordered chain of follow-up sessions hanging off one completed
/// appointment. The chain advances one link at a time: a new session can
/// only be created once every earlier one is completed or cancelled.
pub struct FollowUpChainService {
    store: Arc<dyn SchedulingStore>,
    conflict_service: Arc<ConflictDetectionService>,
    lifecycle: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
}

impl FollowUpChainService {
    pub fn new(state: &SchedulingState, conflict_service: Arc<ConflictDetectionService>) -> Self {
        Self {
            store: Arc::clone(&state.store),
            conflict_service,
            lifecycle: AppointmentLifecycleService::new(),
            clock: Arc::clone(&state.clock),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub async fn list_sessions(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, AppointmentError> {
        let mut sessions = self.store.list_follow_ups(parent_appointment_id).await?;
        sessions.sort_by_key(|session| session.sequence_number);
        Ok(sessions)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<FollowUpSession, AppointmentError> {
        self.store
            .get_follow_up(session_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Follow-up session {}", session_id)))
    }

    #[instrument(skip(self, draft), fields(parent = %draft.parent_appointment_id))]
    pub async fn create_next(&self, draft: FollowUpDraft) -> Result<BookingOutcome<FollowUpSession>, AppointmentError> {
        self.ensure_not_in_past(&draft.preferred_date)?;

        let parent_id = draft.parent_appointment_id;
        let parent = self
            .store
            .get_appointment(parent_id)
            .await?
            .ok_or_else(|| AppointmentError::InvalidParentState(format!("appointment {} does not exist", parent_id)))?;

        if !self.lifecycle.can_own_follow_ups(parent.status) {
            warn!("Rejected follow-up for appointment {} in status {}", parent_id, parent.status);
            return Err(AppointmentError::InvalidParentState(format!(
                "appointment {} is {}, only completed appointments can have follow-up sessions",
                parent_id, parent.status
            )));
        }

        let chain = self.list_sessions(parent_id).await?;
        if let Some(pending) = chain.iter().find(|session| session.status == FollowUpStatus::Pending) {
            warn!("Appointment {} still has pending follow-up #{}", parent_id, pending.sequence_number);
            return Err(AppointmentError::PendingFollowUpExists {
                parent_appointment_id: parent_id,
                pending_session_id: Some(pending.id),
            });
        }

        let conflict = self
            .conflict_service
            .check_conflicts(Some(draft.counselor_id), draft.preferred_date, &draft.preferred_time, None)
            .await?;
        if conflict.has_conflict {
            return Ok(BookingOutcome::Conflict(conflict));
        }

        let sequence_number = chain.iter().map(|session| session.sequence_number).max().unwrap_or(0) + 1;
        let now = self.clock.now();
        let session = FollowUpSession {
            id: Uuid::new_v4(),
            parent_appointment_id: parent_id,
            student_id: parent.student_id,
            counselor_id: draft.counselor_id,
            sequence_number,
            preferred_date: draft.preferred_date,
            preferred_time: draft.preferred_time,
            consultation_type: draft.consultation_type,
            description: draft.description,
            reason: draft.reason,
            status: FollowUpStatus::Pending,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_follow_up(&session).await {
            Ok(()) => {}
            Err(StoreError::SlotTaken { conflicting_with }) => {
                warn!("Follow-up slot for appointment {} was taken concurrently", parent_id);
                return Ok(BookingOutcome::Conflict(ConflictResult::double_booked(conflicting_with)));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Created follow-up #{} ({}) for appointment {}",
            session.sequence_number, session.id, parent_id
        );
        self.notify(&session, NotificationKind::FollowUpScheduled, format!(
            "Follow-up session #{} scheduled for {} {}",
            session.sequence_number, session.preferred_date, session.preferred_time
        ))
        .await;

        Ok(BookingOutcome::Booked(session))
    }

    #[instrument(skip(self, edit))]
    pub async fn edit_session(
        &self,
        session_id: Uuid,
        edit: FollowUpEdit,
    ) -> Result<BookingOutcome<FollowUpSession>, AppointmentError> {
        let mut session = self.get_session(session_id).await?;
        let read_status = session.status;
        self.lifecycle.apply_follow_up(read_status, FollowUpAction::Edit)?;
        self.ensure_not_in_past(&edit.preferred_date)?;

        let conflict = self
            .conflict_service
            .check_conflicts(Some(session.counselor_id), edit.preferred_date, &edit.preferred_time, Some(session.id))
            .await?;
        if conflict.has_conflict {
            return Ok(BookingOutcome::Conflict(conflict));
        }

        session.preferred_date = edit.preferred_date;
        session.preferred_time = edit.preferred_time;
        session.consultation_type = edit.consultation_type;
        session.description = edit.description;
        session.reason = edit.reason;
        session.updated_at = self.clock.now();

        match self.store.update_follow_up(&session, read_status).await {
            Ok(()) => {}
            Err(StoreError::StatusChanged { .. }) => {
                return Err(self.stale_transition(session.id, FollowUpAction::Edit).await);
            }
            Err(StoreError::SlotTaken { conflicting_with }) => {
                return Ok(BookingOutcome::Conflict(ConflictResult::double_booked(conflicting_with)));
            }
            Err(e) => return Err(e.into()),
        }

        info!("Rescheduled follow-up {} to {} {}", session.id, session.preferred_date, session.preferred_time);
        self.notify(&session, NotificationKind::FollowUpRescheduled, format!(
            "Follow-up session #{} moved to {} {}",
            session.sequence_number, session.preferred_date, session.preferred_time
        ))
        .await;

        Ok(BookingOutcome::Booked(session))
    }

    pub async fn complete_session(&self, session_id: Uuid) -> Result<FollowUpSession, AppointmentError> {
        let mut session = self.get_session(session_id).await?;
        let read_status = session.status;
        session.status = self.lifecycle.apply_follow_up(read_status, FollowUpAction::Complete)?;
        session.updated_at = self.clock.now();
        self.save_transition(&session, read_status, FollowUpAction::Complete).await?;

        info!("Completed follow-up #{} ({})", session.sequence_number, session.id);
        self.notify(&session, NotificationKind::FollowUpCompleted, format!(
            "Follow-up session #{} marked as completed",
            session.sequence_number
        ))
        .await;

        Ok(session)
    }

    pub async fn cancel_session(&self, session_id: Uuid, reason: &str) -> Result<FollowUpSession, AppointmentError> {
        let reason = required_text("reason", reason)?;
        let mut session = self.get_session(session_id).await?;
        let read_status = session.status;
        session.status = self.lifecycle.apply_follow_up(read_status, FollowUpAction::Cancel)?;
        session.cancellation_reason = Some(reason);
        session.updated_at = self.clock.now();
        self.save_transition(&session, read_status, FollowUpAction::Cancel).await?;

        info!("Cancelled follow-up #{} ({})", session.sequence_number, session.id);
        self.notify(&session, NotificationKind::FollowUpCancelled, format!(
            "Follow-up session #{} was cancelled",
            session.sequence_number
        ))
        .await;

        Ok(session)
    }

    async fn save_transition(
        &self,
        session: &FollowUpSession,
        read_status: FollowUpStatus,
        action: FollowUpAction,
    ) -> Result<(), AppointmentError> {
        match self.store.update_follow_up(session, read_status).await {
            Ok(()) => Ok(()),
            Err(StoreError::StatusChanged { .. }) => Err(self.stale_transition(session.id, action).await),
            Err(e) => Err(e.into()),
        }
    }

    async fn stale_transition(&self, session_id: Uuid, action: FollowUpAction) -> AppointmentError {
        match self.get_session(session_id).await {
            Ok(current) => {
                warn!(
                    "Follow-up {} changed to {} before {} could be saved",
                    session_id,
                    current.status,
                    action.verb()
                );
                AppointmentError::InvalidTransition {
                    entity: "follow-up session",
                    from: current.status.to_string(),
                    action: action.verb(),
                }
            }
            Err(e) => e,
        }
    }

    fn ensure_not_in_past(&self, date: &chrono::NaiveDate) -> Result<(), AppointmentError> {
        let today = self.clock.today();
        if *date < today {
            debug!("Rejected follow-up date {} before {}", date, today);
            return Err(AppointmentError::InvalidInput(format!(
                "preferred date {} is in the past",
                date
            )));
        }
        Ok(())
    }

    async fn notify(&self, session: &FollowUpSession, kind: NotificationKind, message: String) {
        dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient_id: session.student_id,
                kind,
                related_id: session.id,
                message,
            },
        )
        .await;
    }
}
