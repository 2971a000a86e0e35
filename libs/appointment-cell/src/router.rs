// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::models::SchedulingState;

pub fn appointment_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment).put(handlers::update_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/students/{student_id}", get(handlers::get_student_appointments))
        .route("/counselors/{counselor_id}", get(handlers::get_counselor_appointments))
        // Availability queries
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route("/available-counselors", get(handlers::get_available_counselors))
        .route("/booked", get(handlers::get_booked_ranges))
        .with_state(state)
}

pub fn follow_up_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/create", post(handlers::create_follow_up))
        .route("/edit", post(handlers::edit_follow_up))
        .route("/complete", post(handlers::complete_follow_up))
        .route("/cancel", post(handlers::cancel_follow_up))
        .route("/sessions", get(handlers::get_follow_up_sessions))
        .with_state(state)
}
