pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod store;

pub use models::*;
pub use services::*;
pub use store::{AppointmentFilter, InMemorySchedulingStore, SchedulingStore, StoreError, SupabaseSchedulingStore};
