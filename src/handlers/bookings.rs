use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::booking::{self, BookingEdit, CreateBooking, PaymentMethod};
use crate::state::AppState;

/// Clients send wall-clock times as "HH:MM"; seconds are tolerated.
fn parse_time_param(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("invalid time: {s}")))
}

fn parse_status_param(s: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub court_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub method: String,
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if body.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }
    let method = PaymentMethod::parse(&body.method)
        .ok_or_else(|| AppError::BadRequest(format!("unknown payment method: {}", body.method)))?;

    let created = booking::create_booking(
        &state,
        CreateBooking {
            user_id: body.user_id.trim().to_string(),
            court_id: body.court_id,
            date: body.date,
            start_time: parse_time_param(&body.start_time)?,
            method,
        },
    )
    .await?;

    tracing::info!(
        booking_id = %created.id,
        court_id = created.court_id,
        date = %created.date,
        "booking created"
    );
    Ok(Json(created))
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub date: Option<NaiveDate>,
    pub court_id: Option<i64>,
    pub status: Option<String>,
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(parse_status_param(s)?),
        None => None,
    };

    let db = state.db.lock().unwrap();
    let bookings = queries::list_bookings(
        &db,
        &BookingFilter {
            date: query.date,
            court_id: query.court_id,
            status,
        },
    )?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db.lock().unwrap();
    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(booking))
}

// GET /api/users/:id/bookings
pub async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let db = state.db.lock().unwrap();
    let bookings = queries::get_user_bookings(&db, &user_id)?;
    Ok(Json(bookings))
}

#[derive(Deserialize, Default)]
pub struct UpdateBookingRequest {
    pub status: Option<String>,
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
}

// PATCH /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let status = match body.status.as_deref() {
        Some(s) => Some(parse_status_param(s)?),
        None => None,
    };
    let start_time = match body.start_time.as_deref() {
        Some(s) => Some(parse_time_param(s)?),
        None => None,
    };

    let updated = booking::edit_booking(
        &state,
        &id,
        BookingEdit {
            status,
            court_id: body.court_id,
            date: body.date,
            start_time,
        },
    )?;
    Ok(Json(updated))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let cancelled = booking::cancel_booking(&state, &id)?;
    tracing::info!(booking_id = %id, "booking cancelled");
    Ok(Json(cancelled))
}

#[derive(Deserialize)]
pub struct VoidBookingRequest {
    pub reason: String,
    #[serde(default)]
    pub refund_required: bool,
}

// POST /api/bookings/:id/void
pub async fn void_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<VoidBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    booking::void_booking(&state, &id, &body.reason, body.refund_required)?;
    tracing::info!(
        booking_id = %id,
        refund_required = body.refund_required,
        "booking voided"
    );
    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/bookings/:id/validate
pub async fn validate_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let validated = booking::validate_booking(&state, &id)?;
    tracing::info!(booking_id = %id, code = %validated.code, "booking validated");
    Ok(Json(validated))
}

// GET /api/bookings/code/:code
pub async fn lookup_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (booking, message) = booking::lookup_by_code(&state, &code)?;
    Ok(Json(serde_json::json!({
        "booking": booking,
        "message": message,
    })))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    booking::delete_booking(&state, &id)?;
    tracing::info!(booking_id = %id, "booking deleted");
    Ok(Json(serde_json::json!({"ok": true})))
}
