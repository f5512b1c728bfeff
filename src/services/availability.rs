use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::slot::{generate_daily_slots, is_slot_past};
use crate::models::TimeSlot;

/// The per-slot availability for (court, date) as of `now`: the fixed daily
/// catalogue, minus slots already begun (today only), minus slots held by a
/// blocking booking. Ordering is ascending by start time, always.
///
/// A store failure propagates; it must never read as "all available".
pub fn compute_availability(
    conn: &Connection,
    court_id: i64,
    date: NaiveDate,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<TimeSlot>> {
    let mut slots = generate_daily_slots();

    if date == now.date() {
        for slot in &mut slots {
            if is_slot_past(date, slot.start_time, now) {
                slot.available = false;
            }
        }
    }

    let blocking = queries::find_blocking_bookings(conn, court_id, date)?;
    for slot in &mut slots {
        if blocking.iter().any(|(start, _)| *start == slot.start_time) {
            slot.available = false;
        }
    }

    Ok(slots)
}
