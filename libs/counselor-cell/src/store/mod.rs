mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::Weekday;
use uuid::Uuid;

use shared_models::TimeRange;

use crate::calendar::AvailabilityCalendar;
use crate::models::AvailabilityError;

pub use memory::InMemoryAvailabilityStore;
pub use supabase::SupabaseAvailabilityStore;

/// Persistence for counselor availability. Replacement is wholesale: the
/// previous slots of the affected day (or week) are dropped and the new
/// ones written in one atomic step.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Calendar for the counselor; empty when nothing is stored.
    async fn load_calendar(&self, counselor_id: Uuid) -> Result<AvailabilityCalendar, AvailabilityError>;

    async fn replace_day(
        &self,
        counselor_id: Uuid,
        day: Weekday,
        slots: &[TimeRange],
    ) -> Result<(), AvailabilityError>;

    async fn replace_week(&self, calendar: &AvailabilityCalendar) -> Result<(), AvailabilityError>;

    /// Counselors that can be offered to students, in a stable order.
    async fn counselor_ids(&self) -> Result<Vec<Uuid>, AvailabilityError>;
}
