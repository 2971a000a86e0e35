mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tokio::sync::Notify;
use uuid::Uuid;

use appointment_cell::{
    ActiveBooking, Appointment, AppointmentEdit, AppointmentError, AppointmentFilter, AppointmentStatus,
    AppointmentWorkflow, ConsultationType, FollowUpEdit, FollowUpSession, FollowUpStatus, MethodType,
    SchedulingState, SchedulingStore, StoreError,
};

use common::{appointment_draft, follow_up_draft, harness, monday, range, TestHarness};

/// Holds the first update it sees until the test releases it, so another
/// request can commit in between the read and the write.
struct GatedStore {
    inner: Arc<dyn SchedulingStore>,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    fn wrap(inner: Arc<dyn SchedulingStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            armed: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    async fn hold_first_update(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl SchedulingStore for GatedStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.get_appointment(id).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.inner.insert_appointment(appointment).await
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        self.hold_first_update().await;
        self.inner.update_appointment(appointment, expected_status).await
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_appointments(filter).await
    }

    async fn get_follow_up(&self, id: Uuid) -> Result<Option<FollowUpSession>, StoreError> {
        self.inner.get_follow_up(id).await
    }

    async fn insert_follow_up(&self, session: &FollowUpSession) -> Result<(), StoreError> {
        self.inner.insert_follow_up(session).await
    }

    async fn update_follow_up(
        &self,
        session: &FollowUpSession,
        expected_status: FollowUpStatus,
    ) -> Result<(), StoreError> {
        self.hold_first_update().await;
        self.inner.update_follow_up(session, expected_status).await
    }

    async fn list_follow_ups(&self, parent_appointment_id: Uuid) -> Result<Vec<FollowUpSession>, StoreError> {
        self.inner.list_follow_ups(parent_appointment_id).await
    }

    async fn active_bookings(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<ActiveBooking>, StoreError> {
        self.inner.active_bookings(counselor_id, date, exclude_id).await
    }
}

fn gated_state(h: &TestHarness) -> (SchedulingState, Arc<GatedStore>) {
    let gate = GatedStore::wrap(h.state.store.clone());
    let mut state = h.state.clone();
    state.store = gate.clone();
    (state, gate)
}

fn move_to(counselor_id: Uuid, time: &str) -> AppointmentEdit {
    AppointmentEdit {
        counselor_id: Some(counselor_id),
        preferred_date: monday(),
        preferred_time: range(time),
        consultation_type: ConsultationType::Individual,
        method_type: MethodType::Online,
        purpose: "Academic stress".to_string(),
        description: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_edit_cannot_revive_appointment_rejected_mid_edit() {
    let h = harness().await;
    let workflow = AppointmentWorkflow::new(&h.state);
    let appointment = workflow
        .create_appointment(appointment_draft(Some(h.counselor_id), monday(), "09:00-10:00"))
        .await
        .unwrap()
        .booked()
        .unwrap();

    let (gated, gate) = gated_state(&h);
    let edit = {
        let (appointment_id, counselor_id) = (appointment.id, h.counselor_id);
        tokio::spawn(async move {
            AppointmentWorkflow::new(&gated)
                .edit_appointment(appointment_id, move_to(counselor_id, "10:00-11:00"))
                .await
        })
    };

    // The edit has read the pending row and is parked at its write.
    gate.entered.notified().await;
    let rejected = workflow.reject(appointment.id, "Counselor unavailable").await.unwrap();
    assert_eq!(rejected.status, AppointmentStatus::Rejected);
    gate.release.notify_one();

    let edited = edit.await.unwrap();
    assert_matches!(
        edited,
        Err(AppointmentError::InvalidTransition { from, action: "edit", .. }) if from == "rejected"
    );

    let stored = workflow.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Rejected);
    assert_eq!(stored.rejection_reason.as_deref(), Some("Counselor unavailable"));
    assert_eq!(stored.preferred_time, range("09:00-10:00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_approve_loses_to_concurrent_cancel() {
    let h = harness().await;
    let workflow = AppointmentWorkflow::new(&h.state);
    let appointment = workflow
        .create_appointment(appointment_draft(Some(h.counselor_id), monday(), "09:00-10:00"))
        .await
        .unwrap()
        .booked()
        .unwrap();

    let (gated, gate) = gated_state(&h);
    let appointment_id = appointment.id;
    let approve = tokio::spawn(async move { AppointmentWorkflow::new(&gated).approve(appointment_id).await });

    gate.entered.notified().await;
    workflow.cancel_appointment(appointment.id, "Schedule changed").await.unwrap();
    gate.release.notify_one();

    assert_matches!(
        approve.await.unwrap(),
        Err(AppointmentError::InvalidTransition { from, action: "approve", .. }) if from == "cancelled"
    );
    let stored = workflow.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_follow_up_edit_cannot_revive_cancelled_session() {
    let h = harness().await;
    let workflow = AppointmentWorkflow::new(&h.state);
    let parent = workflow
        .create_appointment(appointment_draft(Some(h.counselor_id), monday(), "08:00-09:00"))
        .await
        .unwrap()
        .booked()
        .unwrap();
    workflow.approve(parent.id).await.unwrap();
    workflow.complete(parent.id).await.unwrap();

    let next_monday = monday() + Duration::days(7);
    let session = workflow
        .create_follow_up(follow_up_draft(parent.id, h.counselor_id, next_monday, "09:00-10:00"))
        .await
        .unwrap()
        .booked()
        .unwrap();

    let (gated, gate) = gated_state(&h);
    let session_id = session.id;
    let edit = tokio::spawn(async move {
        AppointmentWorkflow::new(&gated)
            .edit_follow_up(
                session_id,
                FollowUpEdit {
                    preferred_date: next_monday,
                    preferred_time: range("10:00-11:00"),
                    consultation_type: ConsultationType::Individual,
                    description: None,
                    reason: None,
                },
            )
            .await
    });

    gate.entered.notified().await;
    workflow.cancel_follow_up(session.id, "Student withdrew").await.unwrap();
    gate.release.notify_one();

    assert_matches!(
        edit.await.unwrap(),
        Err(AppointmentError::InvalidTransition { from, action: "edit", .. }) if from == "cancelled"
    );

    let chain = workflow.list_follow_ups(parent.id).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].status, FollowUpStatus::Cancelled);
    assert_eq!(chain[0].preferred_time, range("09:00-10:00"));
}

#[tokio::test]
async fn test_store_refuses_update_from_stale_status() {
    let h = harness().await;
    let workflow = AppointmentWorkflow::new(&h.state);
    let mut appointment = workflow
        .create_appointment(appointment_draft(Some(h.counselor_id), monday(), "09:00-10:00"))
        .await
        .unwrap()
        .booked()
        .unwrap();
    workflow.reject(appointment.id, "Counselor unavailable").await.unwrap();

    appointment.purpose = "Overwritten".to_string();
    let result = h
        .state
        .store
        .update_appointment(&appointment, AppointmentStatus::Pending)
        .await;
    assert_matches!(result, Err(StoreError::StatusChanged { id, .. }) if id == appointment.id);

    let stored = workflow.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored.purpose, "Academic stress");
}
