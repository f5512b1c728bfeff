use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// First offerable hour of the day. The venue opens for hourly bookings
/// at 16:00 and the last slot starts at 23:00.
pub const OPENING_HOUR: u32 = 16;
pub const CLOSING_HOUR: u32 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub available: bool,
}

/// Adds one hour to a slot start, wrapping past midnight (23:00 -> 00:00).
pub fn slot_end_time(start: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt((start.hour() + 1) % 24, start.minute(), 0)
        .unwrap_or(NaiveTime::MIN)
}

/// The fixed daily catalogue: one slot per hour from 16:00 through 23:00,
/// ascending, all initially available. Ordering is a stable contract for
/// slot-selection clients.
pub fn generate_daily_slots() -> Vec<TimeSlot> {
    (OPENING_HOUR..CLOSING_HOUR)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .map(|start| TimeSlot {
            start_time: start,
            end_time: slot_end_time(start),
            available: true,
        })
        .collect()
}

/// True when the slot on `date` starting at `start` has already begun
/// relative to `now`. Slots on future dates are never past.
pub fn is_slot_past(date: NaiveDate, start: NaiveTime, now: NaiveDateTime) -> bool {
    date.and_time(start) <= now
}

/// Whether `start` is one of the catalogue's offered slot starts.
pub fn is_catalogue_slot(start: NaiveTime) -> bool {
    start.minute() == 0
        && start.second() == 0
        && (OPENING_HOUR..CLOSING_HOUR).contains(&start.hour())
}
