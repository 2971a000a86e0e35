// libs/counselor-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::TimeRange;

use crate::calendar::{validate_day_slots, AvailabilityCalendar, WEEK};
use crate::models::{day_name, AvailabilityError, DayAvailabilityResponse};
use crate::store::AvailabilityStore;

pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn AvailabilityStore>) -> Self {
        Self { store }
    }

    pub async fn get_calendar(&self, counselor_id: Uuid) -> Result<AvailabilityCalendar, AvailabilityError> {
        self.store.load_calendar(counselor_id).await
    }

    /// Slots offered on the weekday `date` falls on.
    pub async fn get_availability_for_date(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<DayAvailabilityResponse, AvailabilityError> {
        let day = date.weekday();
        debug!("Fetching availability for counselor {} on {} ({})", counselor_id, date, day_name(day));

        let calendar = self.store.load_calendar(counselor_id).await?;

        Ok(DayAvailabilityResponse {
            counselor_id,
            date: Some(date.format("%Y-%m-%d").to_string()),
            day_of_week: day_name(day).to_string(),
            time_slots: calendar.time_slots(day),
        })
    }

    pub async fn is_within_availability(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
        range: &TimeRange,
    ) -> Result<bool, AvailabilityError> {
        let calendar = self.store.load_calendar(counselor_id).await?;
        Ok(calendar.is_within_availability(date.weekday(), range))
    }

    /// Replaces all slots of one weekday. Validation happens before the store is touched.
    pub async fn replace_slots(
        &self,
        counselor_id: Uuid,
        day: Weekday,
        mut slots: Vec<TimeRange>,
    ) -> Result<DayAvailabilityResponse, AvailabilityError> {
        if let Err(e) = validate_day_slots(day, &mut slots) {
            warn!("Rejected availability for counselor {} on {}: {}", counselor_id, day_name(day), e);
            return Err(e);
        }

        self.store.replace_day(counselor_id, day, &slots).await?;
        info!(
            "Replaced {} availability with {} slot(s) for counselor {}",
            day_name(day),
            slots.len(),
            counselor_id
        );

        Ok(DayAvailabilityResponse {
            counselor_id,
            date: None,
            day_of_week: day_name(day).to_string(),
            time_slots: slots.iter().map(|slot| slot.to_string()).collect(),
        })
    }

    /// Replaces the whole week; days not listed lose their availability.
    pub async fn replace_week(
        &self,
        counselor_id: Uuid,
        days: Vec<(Weekday, Vec<TimeRange>)>,
    ) -> Result<AvailabilityCalendar, AvailabilityError> {
        let mut calendar = AvailabilityCalendar::new(counselor_id);
        let mut seen = HashSet::new();
        for (day, slots) in days {
            if !seen.insert(day) {
                return Err(AvailabilityError::InvalidInput(format!(
                    "{} listed more than once",
                    day_name(day)
                )));
            }
            calendar.replace_slots(day, slots)?;
        }

        self.store.replace_week(&calendar).await?;
        info!(
            "Replaced weekly availability for counselor {} ({} slot(s))",
            counselor_id,
            WEEK.iter().map(|day| calendar.ranges_for_day(*day).len()).sum::<usize>()
        );

        Ok(calendar)
    }

    pub async fn counselor_ids(&self) -> Result<Vec<Uuid>, AvailabilityError> {
        self.store.counselor_ids().await
    }
}
