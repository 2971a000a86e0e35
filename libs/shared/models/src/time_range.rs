//! Wall-clock time ranges and the `YYYY-MM-DD` / `HH:MM` formats exchanged
//! with the UI layer.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid time range '{0}', expected HH:MM-HH:MM")]
    MalformedRange(String),

    #[error("Time range must start before it ends: {start} >= {end}")]
    EmptyRange { start: String, end: String },
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ScheduleParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleParseError::InvalidDate(raw.to_string()))
}

/// Accepts `HH:MM` and the `HH:MM:SS` form Postgres `time` columns return.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ScheduleParseError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| ScheduleParseError::InvalidTime(raw.to_string()))
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleParseError> {
        if start >= end {
            return Err(ScheduleParseError::EmptyRange {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Convenience for whole-minute ranges; `None` when the values are out of range or empty.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        let start = NaiveTime::from_hms_opt(start.0, start.1, 0)?;
        let end = NaiveTime::from_hms_opt(end.0, end.1, 0)?;
        Self::new(start, end).ok()
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Back-to-back ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl FromStr for TimeRange {
    type Err = ScheduleParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| ScheduleParseError::MalformedRange(raw.to_string()))?;
        let start = parse_time(start).map_err(|_| ScheduleParseError::MalformedRange(raw.to_string()))?;
        let end = parse_time(end).map_err(|_| ScheduleParseError::MalformedRange(raw.to_string()))?;
        Self::new(start, end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(raw: &str) -> TimeRange {
        raw.parse().unwrap()
    }

    #[test]
    fn parses_and_formats_24_hour_ranges() {
        let r = range("09:00-10:30");
        assert_eq!(r.to_string(), "09:00-10:30");
        assert_eq!(r.duration_minutes(), 90);
        assert_eq!(range(" 13:00 - 14:00 ").to_string(), "13:00-14:00");
        assert_eq!(range("08:00:00-11:00:00").to_string(), "08:00-11:00");
    }

    #[test]
    fn rejects_malformed_and_empty_ranges() {
        assert!(matches!("0900-1000".parse::<TimeRange>(), Err(ScheduleParseError::MalformedRange(_))));
        assert!(matches!("25:00-26:00".parse::<TimeRange>(), Err(ScheduleParseError::MalformedRange(_))));
        assert!(matches!("10:00-10:00".parse::<TimeRange>(), Err(ScheduleParseError::EmptyRange { .. })));
        assert!(matches!("11:00-10:00".parse::<TimeRange>(), Err(ScheduleParseError::EmptyRange { .. })));
    }

    #[test]
    fn back_to_back_ranges_do_not_overlap() {
        let a = range("09:00-10:00");
        assert!(!a.overlaps(&range("10:00-11:00")));
        assert!(!range("08:00-09:00").overlaps(&a));
        assert!(a.overlaps(&range("09:59-10:30")));
        assert!(a.overlaps(&range("09:15-09:45")));
    }

    #[test]
    fn containment_is_inclusive_at_both_ends() {
        let outer = range("08:00-11:00");
        assert!(outer.contains(&range("08:00-11:00")));
        assert!(outer.contains(&range("09:00-10:00")));
        assert!(!outer.contains(&range("10:30-11:30")));
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(parse_date("2025-03-03").unwrap(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert!(parse_date("03/03/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn serde_uses_the_wire_string() {
        let json = serde_json::to_string(&range("14:00-15:00")).unwrap();
        assert_eq!(json, "\"14:00-15:00\"");
        let back: TimeRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range("14:00-15:00"));
        assert!(serde_json::from_str::<TimeRange>("\"nope\"").is_err());
    }
}
