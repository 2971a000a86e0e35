// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};
use uuid::Uuid;

use counselor_cell::AvailabilityStore;
use shared_models::TimeRange;

use crate::models::{ActiveBooking, AppointmentError, ConflictQuery, ConflictResult};
use crate::store::SchedulingStore;

/// Decides whether a proposed slot can be booked with a counselor.
///
/// The answer is advisory: two requests may both see "no conflict" before
/// either commits. The store's guarded write settles such races.
pub struct ConflictDetectionService {
    availability: Arc<dyn AvailabilityStore>,
    store: Arc<dyn SchedulingStore>,
}

impl ConflictDetectionService {
    pub fn new(availability: Arc<dyn AvailabilityStore>, store: Arc<dyn SchedulingStore>) -> Self {
        Self { availability, store }
    }

    pub async fn check(&self, query: &ConflictQuery) -> Result<ConflictResult, AppointmentError> {
        self.check_conflicts(query.counselor_id, query.date, &query.time_range, query.exclude_id)
            .await
    }

    /// Check a proposed booking for a counselor. `exclude_id` skips the
    /// booking being edited so it never conflicts with itself.
    pub async fn check_conflicts(
        &self,
        counselor_id: Option<Uuid>,
        date: NaiveDate,
        time_range: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<ConflictResult, AppointmentError> {
        let day = date.weekday();

        // No preference: nothing counselor-specific to check until one is assigned.
        let Some(counselor_id) = counselor_id else {
            debug!("No counselor preference for {} {}, skipping conflict check", date, time_range);
            return Ok(ConflictResult::no_conflict());
        };

        debug!("Checking conflicts for counselor {} on {} ({}) {}", counselor_id, date, day, time_range);

        let calendar = self.availability.load_calendar(counselor_id).await?;
        if !calendar.is_within_availability(day, time_range) {
            warn!("Counselor {} is not available on {} {}", counselor_id, day, time_range);
            return Ok(ConflictResult::outside_availability());
        }

        let bookings = self.store.active_bookings(counselor_id, date, exclude_id).await?;
        if let Some(existing) = bookings.iter().find(|booking| booking.time_range.overlaps(time_range)) {
            warn!(
                "Conflict detected for counselor {} on {}: {} overlaps {:?} {} ({})",
                counselor_id, date, time_range, existing.kind, existing.id, existing.time_range
            );
            return Ok(ConflictResult::double_booked(Some(existing.id)));
        }

        Ok(ConflictResult::no_conflict())
    }

    /// Active bookings of the counselor on `date`, in start order.
    pub async fn booked_ranges(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ActiveBooking>, AppointmentError> {
        let mut bookings = self.store.active_bookings(counselor_id, date, None).await?;
        bookings.sort_by_key(|booking| booking.time_range);
        Ok(bookings)
    }

    /// Counselors who could take a booking for `time_range` on `date`.
    pub async fn available_counselors(
        &self,
        date: NaiveDate,
        time_range: &TimeRange,
    ) -> Result<Vec<Uuid>, AppointmentError> {
        let mut available = Vec::new();
        for counselor_id in self.availability.counselor_ids().await? {
            let result = self.check_conflicts(Some(counselor_id), date, time_range, None).await?;
            if !result.has_conflict {
                available.push(counselor_id);
            }
        }

        debug!("{} counselor(s) available on {} {}", available.len(), date, time_range);
        Ok(available)
    }
}
