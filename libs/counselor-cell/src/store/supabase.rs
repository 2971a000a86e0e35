use std::sync::Arc;

use async_trait::async_trait;
use chrono::Weekday;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::{parse_time, TimeRange};

use crate::calendar::AvailabilityCalendar;
use crate::models::{day_name, parse_day, AvailabilityError, AvailabilitySlot};
use crate::store::AvailabilityStore;

/// Row of the `counselor_availability` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub counselor_id: Uuid,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

impl AvailabilityRow {
    fn from_slot(counselor_id: Uuid, slot: &AvailabilitySlot) -> Self {
        Self {
            counselor_id,
            day_of_week: day_name(slot.day_of_week).to_string(),
            start_time: slot.time_range.start().format("%H:%M:%S").to_string(),
            end_time: slot.time_range.end().format("%H:%M:%S").to_string(),
        }
    }

    fn to_slot(&self) -> Result<AvailabilitySlot, AvailabilityError> {
        let day = parse_day(&self.day_of_week)?;
        let range = TimeRange::new(parse_time(&self.start_time)?, parse_time(&self.end_time)?)?;
        Ok(AvailabilitySlot::new(day, range))
    }
}

#[derive(Debug, Deserialize)]
struct CounselorIdRow {
    id: Uuid,
}

/// PostgREST-backed availability. Replacement goes through SQL functions so
/// the delete and the insert commit together.
pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
    service_token: String,
}

impl SupabaseAvailabilityStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_token: config.supabase_service_token.clone(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_token.as_str())
    }
}

fn persistence(err: DatabaseError) -> AvailabilityError {
    AvailabilityError::Persistence(err.to_string())
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn load_calendar(&self, counselor_id: Uuid) -> Result<AvailabilityCalendar, AvailabilityError> {
        let path = format!(
            "/rest/v1/counselor_availability?counselor_id=eq.{}&order=start_time.asc",
            counselor_id
        );

        let rows: Vec<AvailabilityRow> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(persistence)?;

        debug!("Loaded {} availability rows for counselor {}", rows.len(), counselor_id);

        let slots = rows.iter().map(AvailabilityRow::to_slot).collect::<Result<Vec<_>, _>>()?;
        AvailabilityCalendar::from_slots(counselor_id, slots)
    }

    async fn replace_day(
        &self,
        counselor_id: Uuid,
        day: Weekday,
        slots: &[TimeRange],
    ) -> Result<(), AvailabilityError> {
        let rows: Vec<AvailabilityRow> = slots
            .iter()
            .map(|range| AvailabilityRow::from_slot(counselor_id, &AvailabilitySlot::new(day, *range)))
            .collect();

        let body = json!({
            "p_counselor_id": counselor_id,
            "p_day_of_week": day_name(day),
            "p_slots": rows,
        });

        let _: Value = self
            .supabase
            .request(Method::POST, "/rest/v1/rpc/replace_counselor_availability_day", self.token(), Some(body))
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn replace_week(&self, calendar: &AvailabilityCalendar) -> Result<(), AvailabilityError> {
        let rows: Vec<AvailabilityRow> = calendar
            .slots()
            .iter()
            .map(|slot| AvailabilityRow::from_slot(calendar.counselor_id(), slot))
            .collect();

        let body = json!({
            "p_counselor_id": calendar.counselor_id(),
            "p_slots": rows,
        });

        let _: Value = self
            .supabase
            .request(Method::POST, "/rest/v1/rpc/replace_counselor_availability_week", self.token(), Some(body))
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn counselor_ids(&self) -> Result<Vec<Uuid>, AvailabilityError> {
        let rows: Vec<CounselorIdRow> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/counselors?select=id&is_active=eq.true&order=id.asc",
                self.token(),
                None,
            )
            .await
            .map_err(persistence)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}
