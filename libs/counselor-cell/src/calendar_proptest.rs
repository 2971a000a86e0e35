use chrono::{NaiveTime, Weekday};
use proptest::prelude::*;
use uuid::Uuid;

use shared_models::TimeRange;

use crate::calendar::AvailabilityCalendar;

const LAST_MINUTE: u32 = 23 * 60 + 59;

fn minute(m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap()
}

fn range_from(start: u32, len: u32) -> Option<TimeRange> {
    let end = (start + len).min(LAST_MINUTE);
    TimeRange::new(minute(start), minute(end)).ok()
}

// Disjoint (possibly adjacent) slots laid out left to right from (gap, len) pairs.
fn disjoint_slots(layout: &[(u32, u32)]) -> Vec<TimeRange> {
    let mut cursor = 0;
    let mut slots = Vec::new();
    for (gap, len) in layout {
        let start = cursor + gap;
        if start >= LAST_MINUTE {
            break;
        }
        if let Some(slot) = range_from(start, *len) {
            cursor = slot.end().signed_duration_since(minute(0)).num_minutes() as u32;
            slots.push(slot);
        }
    }
    slots
}

fn to_minutes(t: NaiveTime) -> u32 {
    t.signed_duration_since(minute(0)).num_minutes() as u32
}

// Naive reference: every whole minute of the query must be covered by some slot.
fn covered_by_union(slots: &[TimeRange], query: &TimeRange) -> bool {
    (to_minutes(query.start())..to_minutes(query.end())).all(|m| {
        slots
            .iter()
            .any(|slot| to_minutes(slot.start()) <= m && m < to_minutes(slot.end()))
    })
}

fn any_pair_overlaps(slots: &[TimeRange]) -> bool {
    slots
        .iter()
        .enumerate()
        .any(|(i, a)| slots.iter().skip(i + 1).any(|b| a.overlaps(b)))
}

proptest! {
    #[test]
    fn within_availability_matches_interval_union(
        layout in prop::collection::vec((0..240u32, 1..240u32), 0..6),
        query_start in 0..LAST_MINUTE,
        query_len in 1..300u32,
    ) {
        let slots = disjoint_slots(&layout);
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        calendar.replace_slots(Weekday::Mon, slots.clone()).unwrap();

        if let Some(query) = range_from(query_start, query_len) {
            prop_assert_eq!(
                calendar.is_within_availability(Weekday::Mon, &query),
                covered_by_union(&slots, &query),
                "slots {:?} query {}", slots, query
            );
        }
    }

    #[test]
    fn accepted_slot_sets_never_overlap(
        raw in prop::collection::vec((0..LAST_MINUTE, 1..180u32), 0..6),
    ) {
        let slots: Vec<TimeRange> = raw
            .iter()
            .filter_map(|(start, len)| range_from(*start, *len))
            .collect();
        let mut calendar = AvailabilityCalendar::new(Uuid::new_v4());
        let result = calendar.replace_slots(Weekday::Thu, slots.clone());

        prop_assert_eq!(result.is_err(), any_pair_overlaps(&slots));
        prop_assert!(!any_pair_overlaps(calendar.ranges_for_day(Weekday::Thu)));
    }
}
