use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_SERVICE_TIMEZONE};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_token: "test-service-token".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_token: self.supabase_service_token.clone(),
            service_timezone: DEFAULT_SERVICE_TIMEZONE,
            bind_address: "127.0.0.1:0".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// PostgREST row bodies shaped like the scheduling tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn availability_row(counselor_id: &str, day_of_week: &str, start_time: &str, end_time: &str) -> Value {
        json!({
            "counselor_id": counselor_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        student_id: &str,
        counselor_id: Option<&str>,
        preferred_date: &str,
        preferred_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "student_id": student_id,
            "counselor_id": counselor_id,
            "preferred_date": preferred_date,
            "preferred_time": preferred_time,
            "consultation_type": "individual",
            "method_type": "in_person",
            "purpose": "Academic stress",
            "description": null,
            "status": status,
            "cancellation_reason": null,
            "rejection_reason": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn follow_up_response(
        session_id: &str,
        parent_appointment_id: &str,
        student_id: &str,
        counselor_id: &str,
        sequence_number: u32,
        preferred_date: &str,
        preferred_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": session_id,
            "parent_appointment_id": parent_appointment_id,
            "student_id": student_id,
            "counselor_id": counselor_id,
            "sequence_number": sequence_number,
            "preferred_date": preferred_date,
            "preferred_time": preferred_time,
            "consultation_type": "individual",
            "description": null,
            "reason": "Check progress",
            "status": status,
            "cancellation_reason": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }

    pub fn random_id() -> String {
        Uuid::new_v4().to_string()
    }
}
