use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, ErrorCode};

use crate::models::{
    Booking, BookingStatus, Court, CourtStatus, Notification, Payment, PaymentStatus,
    PeriodTotals, RevenueEntry, RevenueKind, VoidRecord,
};

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of a write that competes for a slot. The unique index over
/// (court_id, date, start_time) restricted to blocking statuses is the
/// final authority on double-booking; the availability pre-check is only
/// advisory.
#[derive(Debug, PartialEq, Eq)]
pub enum SlotWrite {
    Applied,
    SlotTaken,
    CodeCollision,
}

fn classify_constraint(e: rusqlite::Error) -> anyhow::Result<SlotWrite> {
    if let rusqlite::Error::SqliteFailure(ffi, ref msg) = e {
        if ffi.code == ErrorCode::ConstraintViolation {
            // SQLite names the violated columns, not the index:
            // "UNIQUE constraint failed: bookings.court_id, bookings.date,
            // bookings.start_time" for the slot index, "bookings.code" for
            // the code column.
            let msg = msg.as_deref().unwrap_or("");
            if msg.contains("bookings.court_id") {
                return Ok(SlotWrite::SlotTaken);
            }
            if msg.contains("bookings.code") {
                return Ok(SlotWrite::CodeCollision);
            }
        }
    }
    Err(e).context("booking write failed")
}

// ── Courts ──

pub struct CourtUpdate {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub location: Option<String>,
    pub hourly_price: Option<i64>,
    pub status: Option<CourtStatus>,
}

pub fn create_court(
    conn: &Connection,
    name: &str,
    kind: &str,
    location: &str,
    hourly_price: i64,
    status: CourtStatus,
) -> anyhow::Result<Court> {
    conn.execute(
        "INSERT INTO courts (name, kind, location, hourly_price, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, kind, location, hourly_price, status.as_str()],
    )?;
    let id = conn.last_insert_rowid();
    get_court(conn, id)?.context("court vanished after insert")
}

pub fn get_court(conn: &Connection, id: i64) -> anyhow::Result<Option<Court>> {
    let result = conn.query_row(
        "SELECT id, name, kind, location, hourly_price, status, created_at, updated_at
         FROM courts WHERE id = ?1",
        params![id],
        |row| Ok(parse_court_row(row)),
    );

    match result {
        Ok(court) => Ok(Some(court?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_courts(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Court>> {
    let sql = if active_only {
        "SELECT id, name, kind, location, hourly_price, status, created_at, updated_at
         FROM courts WHERE status = 'active' ORDER BY name"
    } else {
        "SELECT id, name, kind, location, hourly_price, status, created_at, updated_at
         FROM courts ORDER BY id"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_court_row(row)))?;

    let mut courts = vec![];
    for row in rows {
        courts.push(row??);
    }
    Ok(courts)
}

pub fn update_court(conn: &Connection, id: i64, changes: &CourtUpdate) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE courts SET
            name = COALESCE(?1, name),
            kind = COALESCE(?2, kind),
            location = COALESCE(?3, location),
            hourly_price = COALESCE(?4, hourly_price),
            status = COALESCE(?5, status),
            updated_at = datetime('now')
         WHERE id = ?6",
        params![
            changes.name,
            changes.kind,
            changes.location,
            changes.hourly_price,
            changes.status.map(|s| s.as_str()),
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_court(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    // Historical bookings keep their court_id; nothing cascades.
    let count = conn.execute("DELETE FROM courts WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_court_row(row: &rusqlite::Row) -> anyhow::Result<Court> {
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    Ok(Court {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        location: row.get(3)?,
        hourly_price: row.get(4)?,
        status: CourtStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown court status: {status_str}"))?,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<SlotWrite> {
    let result = conn.execute(
        "INSERT INTO bookings (id, user_id, court_id, date, start_time, end_time, status, code, qr_ref, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.user_id,
            booking.court_id,
            booking.date.format(DATE_FMT).to_string(),
            booking.start_time.format(TIME_FMT).to_string(),
            booking.end_time.format(TIME_FMT).to_string(),
            booking.status.as_str(),
            booking.code,
            booking.qr_ref,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    );

    match result {
        Ok(_) => Ok(SlotWrite::Applied),
        Err(e) => classify_constraint(e),
    }
}

/// Applies an edited slot/status to an existing booking. The partial unique
/// index fires here exactly as on insert.
pub fn update_booking(
    conn: &Connection,
    id: &str,
    court_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: BookingStatus,
) -> anyhow::Result<SlotWrite> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    let result = conn.execute(
        "UPDATE bookings SET court_id = ?1, date = ?2, start_time = ?3, end_time = ?4,
            status = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            court_id,
            date.format(DATE_FMT).to_string(),
            start_time.format(TIME_FMT).to_string(),
            end_time.format(TIME_FMT).to_string(),
            status.as_str(),
            now,
            id,
        ],
    );

    match result {
        Ok(_) => Ok(SlotWrite::Applied),
        Err(e) => classify_constraint(e),
    }
}

/// Start/end pairs of bookings occupying slots for (court, date). Statuses
/// outside the blocking set have already vacated their slot.
pub fn find_blocking_bookings(
    conn: &Connection,
    court_id: i64,
    date: NaiveDate,
) -> anyhow::Result<Vec<(NaiveTime, NaiveTime)>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time FROM bookings
         WHERE court_id = ?1 AND date = ?2
           AND status IN ('pending', 'confirmed', 'realized')
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(
        params![court_id, date.format(DATE_FMT).to_string()],
        |row| {
            let start: String = row.get(0)?;
            let end: String = row.get(1)?;
            Ok((start, end))
        },
    )?;

    let mut blocked = vec![];
    for row in rows {
        let (start, end) = row?;
        blocked.push((parse_time(&start)?, parse_time(&end)?));
    }
    Ok(blocked)
}

/// Advisory check for one slot; `exclude_id` lets an edit ignore the
/// booking's own prior slot.
pub fn slot_blocked(
    conn: &Connection,
    court_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
    exclude_id: Option<&str>,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE court_id = ?1 AND date = ?2 AND start_time = ?3
           AND status IN ('pending', 'confirmed', 'realized')
           AND id != COALESCE(?4, '')",
        params![
            court_id,
            date.format(DATE_FMT).to_string(),
            start_time.format(TIME_FMT).to_string(),
            exclude_id,
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, court_id, date, start_time, end_time, status, code, qr_ref, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_code(conn: &Connection, code: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, court_id, date, start_time, end_time, status, code, qr_ref, created_at, updated_at
         FROM bookings WHERE code = ?1",
        params![code],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub court_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

/// Staff listing: voided bookings are excluded unless asked for by status,
/// ordered by start time.
pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut sql = String::from(
        "SELECT id, user_id, court_id, date, start_time, end_time, status, code, qr_ref, created_at, updated_at
         FROM bookings WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(date) = filter.date {
        params_vec.push(Box::new(date.format(DATE_FMT).to_string()));
        sql.push_str(&format!(" AND date = ?{}", params_vec.len()));
    }
    if let Some(court_id) = filter.court_id {
        params_vec.push(Box::new(court_id));
        sql.push_str(&format!(" AND court_id = ?{}", params_vec.len()));
    }
    match filter.status {
        Some(status) => {
            params_vec.push(Box::new(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", params_vec.len()));
        }
        None => sql.push_str(" AND status != 'voided'"),
    }
    sql.push_str(" ORDER BY date ASC, start_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_user_bookings(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, court_id, date, start_time, end_time, status, code, qr_ref, created_at, updated_at
         FROM bookings WHERE user_id = ?1 ORDER BY date DESC, start_time DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(3)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        court_id: row.get(2)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .with_context(|| format!("bad booking date: {date_str}"))?,
        start_time: parse_time(&start_str)?,
        end_time: parse_time(&end_str)?,
        status: BookingStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?,
        code: row.get(7)?,
        qr_ref: row.get(8)?,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

// ── Void records ──

/// Inserts the void record unless one already exists for this booking.
/// Returns whether a row was written; a retry is a no-op.
pub fn insert_void_record(
    conn: &Connection,
    booking_id: &str,
    reason: &str,
    refund_required: bool,
    refund_amount: Option<i64>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO void_records (booking_id, reason, refund_required, refund_amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![booking_id, reason, refund_required as i32, refund_amount],
    )?;
    Ok(count > 0)
}

pub fn get_void_record(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<VoidRecord>> {
    let result = conn.query_row(
        "SELECT booking_id, reason, refund_required, refund_amount, created_at
         FROM void_records WHERE booking_id = ?1",
        params![booking_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    );

    match result {
        Ok((booking_id, reason, refund_required, refund_amount, created_at)) => {
            Ok(Some(VoidRecord {
                booking_id,
                reason,
                refund_required: refund_required != 0,
                refund_amount,
                created_at: parse_datetime(&created_at)?,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Revenue ledger ──

/// Appends a ledger row unless this booking already has an entry of the same
/// kind. Append-only; period totals are computed by folding at read time.
pub fn insert_revenue_entry(
    conn: &Connection,
    booking_id: &str,
    kind: RevenueKind,
    count_delta: i64,
    amount_delta: i64,
    period: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO revenue_entries (booking_id, kind, count_delta, amount_delta, period)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![booking_id, kind.as_str(), count_delta, amount_delta, period],
    )?;
    Ok(count > 0)
}

pub fn period_totals(conn: &Connection, period: &str) -> anyhow::Result<PeriodTotals> {
    let (bookings, amount) = conn.query_row(
        "SELECT COALESCE(SUM(count_delta), 0), COALESCE(SUM(amount_delta), 0)
         FROM revenue_entries WHERE period = ?1",
        params![period],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;

    Ok(PeriodTotals {
        period: period.to_string(),
        bookings,
        amount,
    })
}

pub fn revenue_entries_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, count_delta, amount_delta, period, created_at
         FROM revenue_entries WHERE booking_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        let kind: String = row.get(2)?;
        let created_at: String = row.get(6)?;
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            kind,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, String>(5)?,
            created_at,
        ))
    })?;

    let mut entries = vec![];
    for row in rows {
        let (id, booking_id, kind, count_delta, amount_delta, period, created_at) = row?;
        entries.push(RevenueEntry {
            id,
            booking_id,
            kind: RevenueKind::parse(&kind)
                .ok_or_else(|| anyhow::anyhow!("unknown revenue kind: {kind}"))?,
            count_delta,
            amount_delta,
            period,
            created_at: parse_datetime(&created_at)?,
        });
    }
    Ok(entries)
}

/// Current year-month ledger bucket.
pub fn current_period() -> String {
    Utc::now().format("%Y-%m").to_string()
}

// ── Payments ──

pub fn insert_payment(
    conn: &Connection,
    booking_id: &str,
    amount: i64,
    method: &str,
    status: PaymentStatus,
    transaction_ref: Option<&str>,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO payments (booking_id, amount, method, status, transaction_ref)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![booking_id, amount, method, status.as_str(), transaction_ref],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_payment_by_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        "SELECT id, booking_id, amount, method, status, transaction_ref, created_at
         FROM payments WHERE booking_id = ?1",
        params![booking_id],
        |row| {
            let status: String = row.get(4)?;
            let created_at: String = row.get(6)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                status,
                row.get::<_, Option<String>>(5)?,
                created_at,
            ))
        },
    );

    match result {
        Ok((id, booking_id, amount, method, status, transaction_ref, created_at)) => {
            Ok(Some(Payment {
                id,
                booking_id,
                amount,
                method,
                status: PaymentStatus::parse(&status)
                    .ok_or_else(|| anyhow::anyhow!("unknown payment status: {status}"))?,
                transaction_ref,
                created_at: parse_datetime(&created_at)?,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_payment_status(
    conn: &Connection,
    booking_id: &str,
    status: PaymentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = ?1 WHERE booking_id = ?2",
        params![status.as_str(), booking_id],
    )?;
    Ok(count > 0)
}

// ── Notifications ──

pub fn insert_notification(
    conn: &Connection,
    user_id: &str,
    title: &str,
    message: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, title, message) VALUES (?1, ?2, ?3)",
        params![user_id, title, message],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_notifications(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, message, is_read, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY id DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i32>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut notifications = vec![];
    for row in rows {
        let (id, user_id, title, message, is_read, created_at) = row?;
        notifications.push(Notification {
            id,
            user_id,
            title,
            message,
            is_read: is_read != 0,
            created_at: parse_datetime(&created_at)?,
        });
    }
    Ok(notifications)
}

// ── Parsing helpers ──

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow::anyhow!("bad time value: {s}"))
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|_| anyhow::anyhow!("bad datetime value: {s}"))
}
