#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use uuid::Uuid;

use appointment_cell::{
    AppointmentDraft, ConsultationType, FollowUpDraft, MethodType, Notification, NotificationSink,
    SchedulingState,
};
use counselor_cell::{AvailabilityStore, InMemoryAvailabilityStore};
use shared_config::DEFAULT_SERVICE_TIMEZONE;
use shared_models::TimeRange;
use shared_utils::FixedClock;

/// Collects every notification so tests can assert on them.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _notification: Notification) -> anyhow::Result<()> {
        anyhow::bail!("mail relay unreachable")
    }
}

pub struct TestHarness {
    pub state: SchedulingState,
    pub availability: Arc<InMemoryAvailabilityStore>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub counselor_id: Uuid,
}

/// "Today" for every test: Saturday 2025-03-01 in the service timezone.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

pub fn range(raw: &str) -> TimeRange {
    raw.parse().unwrap()
}

/// One counselor available Monday 08:00-11:00.
pub async fn harness() -> TestHarness {
    let availability = Arc::new(InMemoryAvailabilityStore::new());
    let clock = Arc::new(FixedClock::at_start_of(today(), DEFAULT_SERVICE_TIMEZONE));
    let sink = Arc::new(RecordingSink::default());
    let counselor_id = Uuid::new_v4();

    availability
        .replace_day(counselor_id, Weekday::Mon, &[range("08:00-11:00")])
        .await
        .unwrap();

    let mut state = SchedulingState::in_memory(availability.clone(), clock.clone());
    state.notifier = sink.clone();

    TestHarness {
        state,
        availability,
        clock,
        sink,
        counselor_id,
    }
}

pub fn appointment_draft(counselor_id: Option<Uuid>, date: NaiveDate, time: &str) -> AppointmentDraft {
    AppointmentDraft {
        student_id: Uuid::new_v4(),
        counselor_id,
        preferred_date: date,
        preferred_time: range(time),
        consultation_type: ConsultationType::Individual,
        method_type: MethodType::InPerson,
        purpose: "Academic stress".to_string(),
        description: None,
    }
}

pub fn follow_up_draft(parent_appointment_id: Uuid, counselor_id: Uuid, date: NaiveDate, time: &str) -> FollowUpDraft {
    FollowUpDraft {
        parent_appointment_id,
        counselor_id,
        preferred_date: date,
        preferred_time: range(time),
        consultation_type: ConsultationType::Individual,
        description: Some("Check in on study plan".to_string()),
        reason: Some("Progress review".to_string()),
    }
}
