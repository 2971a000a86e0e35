use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    Appointment, AppointmentStatus, BookingKind, ConsultationType, MethodType, SchedulingStore, StoreError,
    SupabaseSchedulingStore,
};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(mock_server: &MockServer) -> SupabaseSchedulingStore {
    SupabaseSchedulingStore::new(&TestConfig::with_url(&mock_server.uri()).to_app_config())
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn pending_appointment(counselor_id: Uuid) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        student_id: Uuid::new_v4(),
        counselor_id: Some(counselor_id),
        preferred_date: monday(),
        preferred_time: "09:00-10:00".parse().unwrap(),
        consultation_type: ConsultationType::Individual,
        method_type: MethodType::InPerson,
        purpose: "Academic stress".to_string(),
        description: None,
        status: AppointmentStatus::Pending,
        cancellation_reason: None,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_active_bookings_merges_both_tables() {
    let mock_server = MockServer::start().await;
    let counselor_id = Uuid::new_v4();
    let counselor = counselor_id.to_string();
    let appointment_id = MockSupabaseResponses::random_id();
    let session_id = MockSupabaseResponses::random_id();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("counselor_id", format!("eq.{}", counselor)))
        .and(query_param("preferred_date", "eq.2025-03-03"))
        .and(query_param("status", "in.(pending,approved)"))
        .and(header("Authorization", "Bearer test-service-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &MockSupabaseResponses::random_id(),
                Some(&counselor),
                "2025-03-03",
                "10:00-11:00",
                "approved",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/follow_up_sessions"))
        .and(query_param("counselor_id", format!("eq.{}", counselor)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::follow_up_response(
                &session_id,
                &MockSupabaseResponses::random_id(),
                &MockSupabaseResponses::random_id(),
                &counselor,
                1,
                "2025-03-03",
                "08:00-09:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let bookings = store_for(&mock_server)
        .active_bookings(counselor_id, monday(), None)
        .await
        .unwrap();

    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].kind, BookingKind::FollowUp);
    assert_eq!(bookings[0].id.to_string(), session_id);
    assert_eq!(bookings[1].kind, BookingKind::Appointment);
    assert_eq!(bookings[1].time_range.to_string(), "10:00-11:00");
}

#[tokio::test]
async fn test_insert_appointment_posts_row() {
    let mock_server = MockServer::start().await;
    let appointment = pending_appointment(Uuid::new_v4());

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "id": appointment.id,
            "preferred_time": "09:00-10:00",
            "status": "pending",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment])))
        .expect(1)
        .mount(&mock_server)
        .await;

    store_for(&mock_server).insert_appointment(&appointment).await.unwrap();
}

#[tokio::test]
async fn test_overlap_constraint_maps_to_slot_taken() {
    let mock_server = MockServer::start().await;
    let appointment = pending_appointment(Uuid::new_v4());

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint \"counselor_bookings_no_overlap\"",
        })))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).insert_appointment(&appointment).await;
    assert_matches!(result, Err(StoreError::SlotTaken { conflicting_with: None }));
}

#[tokio::test]
async fn test_pending_follow_up_index_maps_to_domain_error() {
    let mock_server = MockServer::start().await;
    let parent_id = Uuid::new_v4();
    let session: appointment_cell::FollowUpSession = serde_json::from_value(MockSupabaseResponses::follow_up_response(
        &MockSupabaseResponses::random_id(),
        &parent_id.to_string(),
        &MockSupabaseResponses::random_id(),
        &MockSupabaseResponses::random_id(),
        2,
        "2025-03-10",
        "09:00-10:00",
        "pending",
    ))
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/rest/v1/follow_up_sessions"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"follow_up_sessions_one_pending_per_parent\"",
        })))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).insert_follow_up(&session).await;
    assert_matches!(
        result,
        Err(StoreError::PendingFollowUpExists { parent_appointment_id }) if parent_appointment_id == parent_id
    );
}

#[tokio::test]
async fn test_update_is_conditional_on_status_read() {
    let mock_server = MockServer::start().await;
    let mut appointment = pending_appointment(Uuid::new_v4());
    appointment.status = AppointmentStatus::Approved;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id)))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({"status": "approved"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .update_appointment(&appointment, AppointmentStatus::Pending)
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_update_of_row_moved_on_is_status_changed() {
    let mock_server = MockServer::start().await;
    let appointment = pending_appointment(Uuid::new_v4());

    // Another writer already rejected the row, so the status filter matches nothing.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .update_appointment(&appointment, AppointmentStatus::Pending)
        .await;
    assert_matches!(result, Err(StoreError::StatusChanged { id, .. }) if id == appointment.id);
}

#[tokio::test]
async fn test_server_error_is_backend_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).get_appointment(Uuid::new_v4()).await;
    assert_matches!(result, Err(StoreError::Backend(_)));
}
