// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::{parse_date, TimeRange};

use crate::models::{
    AppointmentError, AvailableCounselorsQuery, BookAppointmentRequest, BookedRangesQuery, BookingOutcome,
    CancelFollowUpRequest, CompleteFollowUpRequest, ConflictCheckQuery, ConflictResult, CreateFollowUpRequest,
    EditFollowUpRequest, FollowUpSessionsQuery, ReasonRequest, SchedulingState, UpdateAppointmentRequest,
};
use crate::services::AppointmentWorkflow;

type JsonResponse = (StatusCode, Json<Value>);

// ==============================================================================
// RESPONSE HELPERS
// ==============================================================================

fn conflict_body(result: &ConflictResult) -> Value {
    json!({
        "hasConflict": result.has_conflict,
        "conflictType": result.conflict_type,
        "conflictingWith": result.conflicting_with,
        "message": result.message(),
    })
}

/// A booked entity answers `success_status`; a conflict answers 409 with the conflict details.
fn booking_response<T: Serialize>(
    outcome: BookingOutcome<T>,
    key: &str,
    success_status: StatusCode,
    message: &str,
) -> Result<JsonResponse, AppError> {
    match outcome {
        BookingOutcome::Booked(entity) => {
            let entity = serde_json::to_value(entity)
                .map_err(|e| AppError::Internal(format!("Failed to serialize {}: {}", key, e)))?;
            Ok((
                success_status,
                Json(json!({
                    "status": "success",
                    "message": message,
                    "hasConflict": false,
                    key: entity,
                })),
            ))
        }
        BookingOutcome::Conflict(result) => {
            let mut body = conflict_body(&result);
            body["status"] = json!("error");
            Ok((StatusCode::CONFLICT, Json(body)))
        }
    }
}

fn success(key: &str, value: impl Serialize, message: &str) -> Result<Json<Value>, AppError> {
    let value = serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize {}: {}", key, e)))?;
    Ok(Json(json!({
        "status": "success",
        "message": message,
        key: value,
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<JsonResponse, AppError> {
    let draft = request.parse()?;
    let workflow = AppointmentWorkflow::new(&state);

    let outcome = workflow.create_appointment(draft).await?;
    booking_response(outcome, "appointment", StatusCode::CREATED, "Appointment booked successfully")
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointment = workflow.get_appointment(appointment_id).await?;
    success("appointment", appointment, "Appointment retrieved")
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<JsonResponse, AppError> {
    let edit = request.parse()?;
    let workflow = AppointmentWorkflow::new(&state);

    let outcome = workflow.edit_appointment(appointment_id, edit).await?;
    booking_response(outcome, "appointment", StatusCode::OK, "Appointment updated successfully")
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointment = workflow.cancel_appointment(appointment_id, &request.reason).await?;
    success("appointment", appointment, "Appointment cancelled")
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointment = workflow.approve(appointment_id).await?;
    success("appointment", appointment, "Appointment approved")
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointment = workflow.reject(appointment_id, &request.reason).await?;
    success("appointment", appointment, "Appointment rejected")
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointment = workflow.complete(appointment_id).await?;
    success("appointment", appointment, "Appointment completed")
}

#[axum::debug_handler]
pub async fn get_student_appointments(
    State(state): State<Arc<SchedulingState>>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointments = workflow.list_for_student(student_id).await?;
    success("appointments", appointments, "Appointments retrieved")
}

#[axum::debug_handler]
pub async fn get_counselor_appointments(
    State(state): State<Arc<SchedulingState>>,
    Path(counselor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let appointments = workflow.list_for_counselor(counselor_id).await?;
    success("appointments", appointments, "Appointments retrieved")
}

// ==============================================================================
// AVAILABILITY QUERY HANDLERS
// ==============================================================================

/// Advisory check for the booking form. Always 200; the body says whether the slot conflicts.
#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let query = query.parse()?;
    let workflow = AppointmentWorkflow::new(&state);

    let result = workflow.check_conflict(&query).await?;
    let mut body = conflict_body(&result);
    body["status"] = json!("success");
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn get_available_counselors(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<AvailableCounselorsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&query.date).map_err(AppointmentError::from)?;
    let time_range: TimeRange = query.time.parse().map_err(AppointmentError::from)?;
    let workflow = AppointmentWorkflow::new(&state);

    let counselors = workflow.available_counselors(date, &time_range).await?;
    Ok(Json(json!({
        "status": "success",
        "date": date,
        "time": time_range,
        "counselor_ids": counselors,
    })))
}

#[axum::debug_handler]
pub async fn get_booked_ranges(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<BookedRangesQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&query.date).map_err(AppointmentError::from)?;
    let workflow = AppointmentWorkflow::new(&state);

    let bookings = workflow.booked_ranges(query.counselor_id, date).await?;
    let booked: Vec<String> = bookings.iter().map(|booking| booking.time_range.to_string()).collect();
    Ok(Json(json!({
        "status": "success",
        "counselor_id": query.counselor_id,
        "date": date,
        "booked": booked,
        "bookings": bookings,
    })))
}

// ==============================================================================
// FOLLOW-UP HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_follow_up(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<CreateFollowUpRequest>,
) -> Result<JsonResponse, AppError> {
    let draft = request.parse()?;
    let workflow = AppointmentWorkflow::new(&state);

    let outcome = workflow.create_follow_up(draft).await?;
    booking_response(outcome, "session", StatusCode::CREATED, "Follow-up session created")
}

#[axum::debug_handler]
pub async fn edit_follow_up(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<EditFollowUpRequest>,
) -> Result<JsonResponse, AppError> {
    let edit = request.parse()?;
    let workflow = AppointmentWorkflow::new(&state);

    let outcome = workflow.edit_follow_up(request.id, edit).await?;
    booking_response(outcome, "session", StatusCode::OK, "Follow-up session updated")
}

#[axum::debug_handler]
pub async fn complete_follow_up(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<CompleteFollowUpRequest>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let session = workflow.complete_follow_up(request.id).await?;
    success("session", session, "Follow-up session completed")
}

#[axum::debug_handler]
pub async fn cancel_follow_up(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<CancelFollowUpRequest>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let session = workflow.cancel_follow_up(request.id, &request.reason).await?;
    success("session", session, "Follow-up session cancelled")
}

#[axum::debug_handler]
pub async fn get_follow_up_sessions(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<FollowUpSessionsQuery>,
) -> Result<Json<Value>, AppError> {
    let workflow = AppointmentWorkflow::new(&state);
    let sessions = workflow.list_follow_ups(query.parent_appointment_id).await?;
    success("sessions", sessions, "Follow-up sessions retrieved")
}
