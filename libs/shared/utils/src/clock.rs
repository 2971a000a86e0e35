use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use shared_config::AppConfig;

/// Source of "now" for scheduling rules. Calendar dates are always resolved
/// in the service timezone, never the host's local zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn timezone(&self) -> Tz;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.timezone()).date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.service_timezone)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Utc>>,
    timezone: Tz,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            instant: RwLock::new(instant),
            timezone,
        }
    }

    /// Midnight at the start of `date` in the given zone's wall clock, expressed in UTC.
    pub fn at_start_of(date: NaiveDate, timezone: Tz) -> Self {
        let local_midnight = date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(timezone).earliest())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
        Self::new(local_midnight, timezone)
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.write() {
            *guard = instant;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_is_resolved_in_service_timezone() {
        // 2025-03-02 17:30 UTC is already 2025-03-03 01:30 in Manila (UTC+8).
        let instant = Utc.with_ymd_and_hms(2025, 3, 2, 17, 30, 0).unwrap();
        let clock = FixedClock::new(instant, chrono_tz::Asia::Manila);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());

        let utc_clock = FixedClock::new(instant, chrono_tz::UTC);
        assert_eq!(utc_clock.today(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }

    #[test]
    fn start_of_day_and_advance() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let clock = FixedClock::at_start_of(date, chrono_tz::Asia::Manila);
        assert_eq!(clock.today(), date);

        clock.advance(Duration::hours(23));
        assert_eq!(clock.today(), date);
        clock.advance(Duration::hours(1));
        assert_eq!(clock.today(), date.succ_opt().unwrap());
    }
}
