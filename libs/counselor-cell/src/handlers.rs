// libs/counselor-cell/src/handlers.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::parse_date;

use crate::calendar::WEEK;
use crate::models::{
    day_name, parse_day, AvailabilityError, AvailabilityQuery, CounselorState, ReplaceDayRequest,
    ReplaceWeekRequest,
};
use crate::services::AvailabilityService;

/// Slots offered on the weekday of `date`: `{ time_slots: ["HH:MM-HH:MM", ...] }`.
#[axum::debug_handler]
pub async fn get_availability_for_date(
    State(state): State<Arc<CounselorState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&query.date).map_err(AvailabilityError::from)?;
    let availability_service = AvailabilityService::new(state.availability_store.clone());

    let availability = availability_service
        .get_availability_for_date(query.counselor_id, date)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "counselor_id": availability.counselor_id,
        "date": availability.date,
        "day_of_week": availability.day_of_week,
        "time_slots": availability.time_slots,
    })))
}

#[axum::debug_handler]
pub async fn get_weekly_availability(
    State(state): State<Arc<CounselorState>>,
    Path(counselor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(state.availability_store.clone());
    let calendar = availability_service.get_calendar(counselor_id).await?;

    let days: BTreeMap<&str, Vec<String>> = WEEK
        .iter()
        .map(|day| (day_name(*day), calendar.time_slots(*day)))
        .collect();

    Ok(Json(json!({
        "status": "success",
        "counselor_id": counselor_id,
        "days": days,
    })))
}

#[axum::debug_handler]
pub async fn replace_day_availability(
    State(state): State<Arc<CounselorState>>,
    Path((counselor_id, day)): Path<(Uuid, String)>,
    Json(request): Json<ReplaceDayRequest>,
) -> Result<Json<Value>, AppError> {
    let day = parse_day(&day)?;
    let slots = request.parse()?;

    let availability_service = AvailabilityService::new(state.availability_store.clone());
    let updated = availability_service.replace_slots(counselor_id, day, slots).await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("{} availability updated", updated.day_of_week),
        "day_of_week": updated.day_of_week,
        "time_slots": updated.time_slots,
    })))
}

#[axum::debug_handler]
pub async fn replace_week_availability(
    State(state): State<Arc<CounselorState>>,
    Path(counselor_id): Path<Uuid>,
    Json(request): Json<ReplaceWeekRequest>,
) -> Result<Json<Value>, AppError> {
    let days = request.parse()?;

    let availability_service = AvailabilityService::new(state.availability_store.clone());
    let calendar = availability_service.replace_week(counselor_id, days).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Weekly availability updated",
        "slot_count": calendar.slots().len(),
    })))
}
