use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Weekday;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::TimeRange;

use crate::calendar::AvailabilityCalendar;
use crate::models::AvailabilityError;
use crate::store::AvailabilityStore;

#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    calendars: RwLock<HashMap<Uuid, AvailabilityCalendar>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn load_calendar(&self, counselor_id: Uuid) -> Result<AvailabilityCalendar, AvailabilityError> {
        let calendars = self.calendars.read().await;
        Ok(calendars
            .get(&counselor_id)
            .cloned()
            .unwrap_or_else(|| AvailabilityCalendar::new(counselor_id)))
    }

    async fn replace_day(
        &self,
        counselor_id: Uuid,
        day: Weekday,
        slots: &[TimeRange],
    ) -> Result<(), AvailabilityError> {
        let mut calendars = self.calendars.write().await;
        let calendar = calendars
            .entry(counselor_id)
            .or_insert_with(|| AvailabilityCalendar::new(counselor_id));
        calendar.replace_slots(day, slots.to_vec())
    }

    async fn replace_week(&self, calendar: &AvailabilityCalendar) -> Result<(), AvailabilityError> {
        let mut calendars = self.calendars.write().await;
        calendars.insert(calendar.counselor_id(), calendar.clone());
        Ok(())
    }

    async fn counselor_ids(&self) -> Result<Vec<Uuid>, AvailabilityError> {
        let calendars = self.calendars.read().await;
        let mut ids: Vec<Uuid> = calendars.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
