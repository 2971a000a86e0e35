pub mod calendar;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

#[cfg(test)]
mod calendar_proptest;

pub use calendar::{AvailabilityCalendar, WEEK};
pub use models::*;
pub use store::{AvailabilityStore, InMemoryAvailabilityStore, SupabaseAvailabilityStore};
