pub mod error;
pub mod time_range;

pub use time_range::{parse_date, parse_time, ScheduleParseError, TimeRange};
