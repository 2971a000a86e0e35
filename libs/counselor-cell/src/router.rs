// libs/counselor-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::models::CounselorState;

pub fn counselor_routes(state: Arc<CounselorState>) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability_for_date))
        .route("/{counselor_id}/availability", get(handlers::get_weekly_availability))
        .route("/{counselor_id}/availability", put(handlers::replace_week_availability))
        .route("/{counselor_id}/availability/{day}", put(handlers::replace_day_availability))
        .with_state(state)
}
