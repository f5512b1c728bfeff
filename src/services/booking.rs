use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::db::queries::{self, SlotWrite};
use crate::errors::AppError;
use crate::models::slot::{is_catalogue_slot, is_slot_past, slot_end_time};
use crate::models::{Booking, BookingStatus, CourtStatus, PaymentStatus, RevenueKind};
use crate::services::payments::{PaymentOutcome, PaymentRequest};
use crate::services::{events, ledger, notify};
use crate::state::AppState;

const CODE_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: String,
    pub court_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub method: PaymentMethod,
}

/// The mutable fields of a booking edit. End time is never accepted from
/// callers; it is re-derived whenever the start time changes.
#[derive(Debug, Clone, Default)]
pub struct BookingEdit {
    pub status: Option<BookingStatus>,
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

/// Short human-shareable booking code from fresh UUID entropy. Collisions
/// are accepted at insert time via the unique code column and retried.
fn generate_booking_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(CODE_LEN)
        .map(|b| CODE_CHARSET[*b as usize % CODE_CHARSET.len()] as char)
        .collect()
}

fn qr_payload(code: &str, user_id: &str, court_id: i64, date: NaiveDate, time: NaiveTime) -> String {
    serde_json::json!({
        "code": code,
        "user_id": user_id,
        "court_id": court_id,
        "date": date.format("%Y-%m-%d").to_string(),
        "time": time.format("%H:%M").to_string(),
    })
    .to_string()
}

/// Creates a booking on an open slot. The availability pre-check is
/// advisory; the storage uniqueness constraint decides races, and a losing
/// insert surfaces as `SlotUnavailable`.
///
/// Cash (staff) bookings and approved online payments both land directly on
/// Confirmed; Pending is reserved for flows awaiting external confirmation
/// and no current path produces it.
pub async fn create_booking(
    state: &Arc<AppState>,
    req: CreateBooking,
) -> Result<Booking, AppError> {
    let now = Utc::now().naive_utc();

    if !is_catalogue_slot(req.start_time) || is_slot_past(req.date, req.start_time, now) {
        return Err(AppError::SlotUnavailable);
    }

    // Court lookup and advisory slot check; no lock is held across the
    // payment/QR calls below.
    let court = {
        let db = state.db.lock().unwrap();
        let court = queries::get_court(&db, req.court_id)?
            .ok_or_else(|| AppError::NotFound(format!("court {}", req.court_id)))?;
        if queries::slot_blocked(&db, req.court_id, req.date, req.start_time, None)? {
            return Err(AppError::SlotUnavailable);
        }
        court
    };

    if court.status != CourtStatus::Active {
        return Err(AppError::BadRequest(format!(
            "court {} is not open for booking",
            court.name
        )));
    }

    let amount = court.hourly_price;
    let transaction_ref = match req.method {
        PaymentMethod::Cash => None,
        PaymentMethod::Online => {
            let outcome = state
                .payments
                .process(&PaymentRequest {
                    amount,
                    payer_id: req.user_id.clone(),
                    description: format!("{} {} {}", court.name, req.date, req.start_time),
                })
                .await
                .map_err(|e| AppError::PaymentFailed(e.to_string()))?;

            match outcome {
                PaymentOutcome::Approved { transaction_ref } => Some(transaction_ref),
                PaymentOutcome::Declined { reason } => {
                    return Err(AppError::PaymentFailed(reason));
                }
            }
        }
    };

    let end_time = slot_end_time(req.start_time);

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate_booking_code();
        let payload = qr_payload(&code, &req.user_id, req.court_id, req.date, req.start_time);
        let qr_ref = state.qr.encode(&payload).await?;

        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id.clone(),
            court_id: req.court_id,
            date: req.date,
            start_time: req.start_time,
            end_time,
            status: BookingStatus::Confirmed,
            code,
            qr_ref: Some(qr_ref),
            created_at: now,
            updated_at: now,
        };

        let written = {
            let db = state.db.lock().unwrap();
            let tx = db.unchecked_transaction().map_err(anyhow::Error::from)?;

            let written = queries::insert_booking(&tx, &booking)?;
            if written == SlotWrite::Applied {
                queries::insert_revenue_entry(
                    &tx,
                    &booking.id,
                    RevenueKind::Sale,
                    1,
                    amount,
                    &queries::current_period(),
                )?;
                queries::insert_payment(
                    &tx,
                    &booking.id,
                    amount,
                    req.method.as_str(),
                    PaymentStatus::Processed,
                    transaction_ref.as_deref(),
                )?;
                queries::insert_notification(
                    &tx,
                    &booking.user_id,
                    "Booking confirmed",
                    &format!(
                        "Your booking for {} on {} at {} is confirmed. Code: {}",
                        court.name,
                        booking.date,
                        booking.start_time.format("%H:%M"),
                        booking.code
                    ),
                )?;
                tx.commit().map_err(anyhow::Error::from)?;
            }
            written
        };

        match written {
            SlotWrite::Applied => {
                events::publish(state, booking.court_id, booking.date);
                return Ok(booking);
            }
            SlotWrite::SlotTaken => return Err(AppError::SlotUnavailable),
            SlotWrite::CodeCollision => {
                tracing::warn!(attempt, "booking code collision, regenerating");
            }
        }
    }

    Err(AppError::Store(anyhow::anyhow!(
        "could not allocate a unique booking code"
    )))
}

/// Applies an explicit edit. A changed slot must pass the same availability
/// precondition as creation, excluding this booking's own prior slot; a
/// status change must be a legal lifecycle edge re-validated against the
/// latest stored state.
pub fn edit_booking(
    state: &Arc<AppState>,
    id: &str,
    edit: BookingEdit,
) -> Result<Booking, AppError> {
    let now = Utc::now().naive_utc();
    let db = state.db.lock().unwrap();

    let current =
        queries::get_booking(&db, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let status = edit.status.unwrap_or(current.status);
    let court_id = edit.court_id.unwrap_or(current.court_id);
    let date = edit.date.unwrap_or(current.date);
    let start_time = edit.start_time.unwrap_or(current.start_time);

    let slot_changed = court_id != current.court_id
        || date != current.date
        || start_time != current.start_time;

    if status != current.status && !current.status.can_transition(status) {
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: status,
        });
    }
    if slot_changed && current.status.is_terminal() {
        // A terminal booking no longer holds a slot to move.
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: status,
        });
    }

    if slot_changed {
        if !is_catalogue_slot(start_time) || is_slot_past(date, start_time, now) {
            return Err(AppError::SlotUnavailable);
        }
        if queries::slot_blocked(&db, court_id, date, start_time, Some(id))? {
            return Err(AppError::SlotUnavailable);
        }
    }

    let end_time = slot_end_time(start_time);
    match queries::update_booking(&db, id, court_id, date, start_time, end_time, status)? {
        SlotWrite::Applied => {}
        _ => return Err(AppError::SlotUnavailable),
    }

    let updated = queries::get_booking(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    drop(db);

    events::publish(state, current.court_id, current.date);
    if slot_changed {
        events::publish(state, court_id, date);
    }

    Ok(updated)
}

/// Client self-cancellation; only a Pending booking can be cancelled.
pub fn cancel_booking(state: &Arc<AppState>, id: &str) -> Result<Booking, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if !booking.status.can_transition(BookingStatus::Cancelled) {
            return Err(AppError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }
        queries::update_booking_status(&db, id, BookingStatus::Cancelled)?;
        booking
    };

    notify::record_notification(
        state,
        &booking.user_id,
        "Booking cancelled",
        &format!("Your booking {} has been cancelled.", booking.code),
    );
    events::publish(state, booking.court_id, booking.date);

    queries::get_booking(&state.db.lock().unwrap(), id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// QR/staff validation: marks attendance. Re-validating a Realized booking
/// fails loudly; Cancelled and Voided bookings are not validatable.
pub fn validate_booking(state: &Arc<AppState>, id: &str) -> Result<Booking, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        match booking.status {
            BookingStatus::Realized => return Err(AppError::AlreadyValidated),
            BookingStatus::Cancelled | BookingStatus::Voided => {
                return Err(AppError::NotValidatable(booking.status));
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {
                queries::update_booking_status(&db, id, BookingStatus::Realized)?;
            }
        }
        booking
    };

    notify::record_notification(
        state,
        &booking.user_id,
        "Booking validated",
        &format!("Your booking with code {} has been validated.", booking.code),
    );
    events::publish(state, booking.court_id, booking.date);

    queries::get_booking(&state.db.lock().unwrap(), id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// Staff void. The status flip commits first, then the ledger stage runs as
/// one transaction; a ledger failure after the flip surfaces as
/// `PartialVoidFailure` and a re-issued void completes the missing ledger
/// writes idempotently.
pub fn void_booking(
    state: &Arc<AppState>,
    id: &str,
    reason: &str,
    refund_required: bool,
) -> Result<(), AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::MissingReason);
    }

    let booking = {
        let db = state.db.lock().unwrap();

        let booking = queries::get_booking(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        let payment = queries::get_payment_by_booking(&db, id)?;

        match booking.status {
            BookingStatus::Realized | BookingStatus::Cancelled => {
                return Err(AppError::InvalidTransition {
                    from: booking.status,
                    to: BookingStatus::Voided,
                });
            }
            BookingStatus::Voided => {
                // Reconciliation retry only: a fully-voided booking is terminal.
                if queries::get_void_record(&db, id)?.is_some() {
                    return Err(AppError::InvalidTransition {
                        from: booking.status,
                        to: BookingStatus::Voided,
                    });
                }
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {
                if refund_required && payment.is_none() {
                    return Err(AppError::BadRequest(
                        "booking has no payment to refund".to_string(),
                    ));
                }
                queries::update_booking_status(&db, id, BookingStatus::Voided)?;
            }
        }

        ledger::apply_void_ledger(&db, id, reason, refund_required, payment.as_ref())
            .map_err(|e| AppError::PartialVoidFailure(e.to_string()))?;

        booking
    };

    notify::record_notification(
        state,
        &booking.user_id,
        "Booking voided",
        &format!("Your booking {} was voided: {reason}", booking.code),
    );
    events::publish(state, booking.court_id, booking.date);

    Ok(())
}

/// Staff hard delete (admin cleanup). Audit rows (payments, ledger, void
/// records) are kept.
pub fn delete_booking(state: &Arc<AppState>, id: &str) -> Result<(), AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        queries::delete_booking(&db, id)?;
        booking
    };

    events::publish(state, booking.court_id, booking.date);
    Ok(())
}

/// Looks a booking up from a scanned QR payload or a manually typed code,
/// with an eligibility message for states that cannot be validated.
pub fn lookup_by_code(
    state: &Arc<AppState>,
    input: &str,
) -> Result<(Booking, Option<String>), AppError> {
    // Scanned QR payloads are JSON carrying the code; manual entry is bare.
    let code = serde_json::from_str::<serde_json::Value>(input)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_string))
        .unwrap_or_else(|| input.trim().to_uppercase());

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_code(&db, &code)?
        .ok_or_else(|| AppError::NotFound(format!("booking code {code}")))?;

    let message = match booking.status {
        BookingStatus::Realized => Some("This booking has already been validated.".to_string()),
        BookingStatus::Cancelled | BookingStatus::Voided => Some(format!(
            "A booking in status {} cannot be validated.",
            booking.status.as_str()
        )),
        _ => None,
    };

    Ok((booking, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_code_shape() {
        for _ in 0..50 {
            let code = generate_booking_code();
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_qr_payload_binds_booking_identity() {
        let payload = qr_payload(
            "AB12CD",
            "11.111.111-1",
            5,
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        let v: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(v["code"], "AB12CD");
        assert_eq!(v["user_id"], "11.111.111-1");
        assert_eq!(v["court_id"], 5);
        assert_eq!(v["date"], "2024-06-10");
        assert_eq!(v["time"], "18:00");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("online"), Some(PaymentMethod::Online));
        assert_eq!(PaymentMethod::parse("card"), None);
    }
}
