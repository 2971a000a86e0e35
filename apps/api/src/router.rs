use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use appointment_cell::router::{appointment_routes, follow_up_routes};
use appointment_cell::SchedulingState;
use counselor_cell::router::counselor_routes;
use counselor_cell::{AvailabilityStore, CounselorState, InMemoryAvailabilityStore};
use shared_config::AppConfig;
use shared_utils::SystemClock;

/// Per-cell router state. Both cells read the same availability store.
pub struct AppStates {
    pub counselor: Arc<CounselorState>,
    pub scheduling: Arc<SchedulingState>,
}

impl AppStates {
    pub fn from_config(config: &AppConfig) -> Self {
        let scheduling = if config.is_configured() {
            SchedulingState::from_config(config)
        } else {
            info!("Using in-memory scheduling stores");
            let availability: Arc<dyn AvailabilityStore> = Arc::new(InMemoryAvailabilityStore::new());
            SchedulingState::in_memory(availability, Arc::new(SystemClock::from_config(config)))
        };

        Self {
            counselor: Arc::new(CounselorState {
                availability_store: Arc::clone(&scheduling.availability_store),
            }),
            scheduling: Arc::new(scheduling),
        }
    }
}

pub fn create_router(states: AppStates) -> Router {
    Router::new()
        .route("/", get(|| async { "Counseling scheduling API is running!" }))
        .nest("/counselors", counselor_routes(states.counselor))
        .nest("/appointments", appointment_routes(states.scheduling.clone()))
        .nest("/follow-up", follow_up_routes(states.scheduling))
}
