// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use counselor_cell::{AvailabilityStore, SupabaseAvailabilityStore};
use shared_config::AppConfig;
use shared_utils::{Clock, SystemClock};

use crate::models::SchedulingState;
use crate::services::TracingNotificationSink;
use crate::store::{InMemorySchedulingStore, SupabaseSchedulingStore};

impl SchedulingState {
    /// Supabase-backed stores, the service timezone clock and log-only notifications.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            availability_store: Arc::new(SupabaseAvailabilityStore::new(config)),
            store: Arc::new(SupabaseSchedulingStore::new(config)),
            clock: Arc::new(SystemClock::from_config(config)),
            notifier: Arc::new(TracingNotificationSink),
        }
    }

    /// Process-local scheduling store over a shared availability store.
    pub fn in_memory(availability_store: Arc<dyn AvailabilityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            availability_store,
            store: Arc::new(InMemorySchedulingStore::new()),
            clock,
            notifier: Arc::new(TracingNotificationSink),
        }
    }
}
