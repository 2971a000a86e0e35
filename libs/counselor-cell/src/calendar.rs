// libs/counselor-cell/src/calendar.rs
use chrono::{NaiveTime, Weekday};
use uuid::Uuid;

use shared_models::TimeRange;

use crate::models::{day_name, AvailabilityError, AvailabilitySlot};

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A counselor's recurring weekly availability. Slots within a day are kept
/// sorted by start time and never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCalendar {
    counselor_id: Uuid,
    days: [Vec<TimeRange>; 7],
}

impl AvailabilityCalendar {
    pub fn new(counselor_id: Uuid) -> Self {
        Self {
            counselor_id,
            days: Default::default(),
        }
    }

    /// Builds a calendar from stored rows, validating each day the same way `replace_slots` does.
    pub fn from_slots<I>(counselor_id: Uuid, slots: I) -> Result<Self, AvailabilityError>
    where
        I: IntoIterator<Item = AvailabilitySlot>,
    {
        let mut grouped: [Vec<TimeRange>; 7] = Default::default();
        for slot in slots {
            grouped[day_index(slot.day_of_week)].push(slot.time_range);
        }

        let mut calendar = Self::new(counselor_id);
        for day in WEEK {
            let day_slots = std::mem::take(&mut grouped[day_index(day)]);
            calendar.replace_slots(day, day_slots)?;
        }
        Ok(calendar)
    }

    pub fn counselor_id(&self) -> Uuid {
        self.counselor_id
    }

    pub fn get_slots_for_day(&self, day: Weekday) -> Vec<AvailabilitySlot> {
        self.ranges_for_day(day)
            .iter()
            .map(|range| AvailabilitySlot::new(day, *range))
            .collect()
    }

    pub fn ranges_for_day(&self, day: Weekday) -> &[TimeRange] {
        &self.days[day_index(day)]
    }

    /// Replaces every slot of `day`. On error the calendar is left untouched.
    pub fn replace_slots(&mut self, day: Weekday, mut new_slots: Vec<TimeRange>) -> Result<(), AvailabilityError> {
        validate_day_slots(day, &mut new_slots)?;
        self.days[day_index(day)] = new_slots;
        Ok(())
    }

    /// True iff `range` lies inside the union of the day's slots. Adjacent
    /// slots join, so a booking may straddle a slot boundary.
    pub fn is_within_availability(&self, day: Weekday, range: &TimeRange) -> bool {
        merged_windows(self.ranges_for_day(day))
            .into_iter()
            .any(|(start, end)| start <= range.start() && range.end() <= end)
    }

    /// `HH:MM-HH:MM` strings for the day, in start order.
    pub fn time_slots(&self, day: Weekday) -> Vec<String> {
        self.ranges_for_day(day).iter().map(|range| range.to_string()).collect()
    }

    pub fn slots(&self) -> Vec<AvailabilitySlot> {
        WEEK.iter().flat_map(|day| self.get_slots_for_day(*day)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|day| day.is_empty())
    }
}

/// Sorts `slots` by start time and rejects any pair that overlaps.
pub fn validate_day_slots(day: Weekday, slots: &mut [TimeRange]) -> Result<(), AvailabilityError> {
    slots.sort();
    if let Some(pair) = slots.windows(2).find(|pair| pair[0].overlaps(&pair[1])) {
        return Err(AvailabilityError::InvalidAvailability(format!(
            "{} slots {} and {} overlap",
            day_name(day),
            pair[0],
            pair[1]
        )));
    }
    Ok(())
}

fn day_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

fn merged_windows(sorted: &[TimeRange]) -> Vec<(NaiveTime, NaiveTime)> {
    let mut merged: Vec<(NaiveTime, NaiveTime)> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some((_, end)) if range.start() <= *end => {
                if range.end() > *end {
                    *end = range.end();
                }
            }
            _ => merged.push((range.start(), range.end())),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(raw: &str) -> TimeRange {
        raw.parse().unwrap()
    }

    #[test]
    fn replace_sorts_and_rejects_overlap() {
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        calendar
            .replace_slots(Weekday::Mon, vec![range("13:00-15:00"), range("08:00-11:00")])
            .unwrap();
        assert_eq!(calendar.time_slots(Weekday::Mon), vec!["08:00-11:00", "13:00-15:00"]);

        let err = calendar
            .replace_slots(Weekday::Mon, vec![range("08:00-10:00"), range("09:30-11:00")])
            .unwrap_err();
        assert!(matches!(err, AvailabilityError::InvalidAvailability(_)));
        // failed replace keeps the previous slots
        assert_eq!(calendar.time_slots(Weekday::Mon), vec!["08:00-11:00", "13:00-15:00"]);
    }

    #[test]
    fn adjacent_slots_are_accepted_and_joined() {
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        calendar
            .replace_slots(Weekday::Tue, vec![range("08:00-09:00"), range("09:00-10:00")])
            .unwrap();
        assert!(calendar.is_within_availability(Weekday::Tue, &range("08:30-09:30")));
        assert!(!calendar.is_within_availability(Weekday::Tue, &range("09:30-10:30")));
    }

    #[test]
    fn other_days_are_unaffected() {
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        calendar.replace_slots(Weekday::Mon, vec![range("08:00-11:00")]).unwrap();
        assert!(calendar.get_slots_for_day(Weekday::Wed).is_empty());
        assert!(!calendar.is_within_availability(Weekday::Wed, &range("08:00-09:00")));
        assert!(!calendar.is_empty());
    }

    #[test]
    fn gap_between_slots_is_not_available() {
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        calendar
            .replace_slots(Weekday::Fri, vec![range("08:00-10:00"), range("11:00-12:00")])
            .unwrap();
        assert!(calendar.is_within_availability(Weekday::Fri, &range("11:00-12:00")));
        assert!(!calendar.is_within_availability(Weekday::Fri, &range("09:30-11:30")));
    }
}
