use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::broadcast;
use tower::ServiceExt;

use courtbook::config::AppConfig;
use courtbook::db::{self, queries};
use courtbook::handlers;
use courtbook::models::{Booking, BookingStatus, CourtStatus, PaymentStatus};
use courtbook::services::payments::{PaymentOutcome, PaymentProvider, PaymentRequest};
use courtbook::services::qr::QrProvider;
use courtbook::state::AppState;

// ── Mock Providers ──

struct MockPayments {
    approve: bool,
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn process(&self, request: &PaymentRequest) -> anyhow::Result<PaymentOutcome> {
        if self.approve {
            Ok(PaymentOutcome::Approved {
                transaction_ref: format!("tx-{}", request.amount),
            })
        } else {
            Ok(PaymentOutcome::Declined {
                reason: "card declined".to_string(),
            })
        }
    }
}

struct MockQr;

#[async_trait]
impl QrProvider for MockQr {
    async fn encode(&self, _payload: &str) -> anyhow::Result<String> {
        Ok("https://qr.test/image.png".to_string())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        payment_gateway_url: "http://localhost:4100".to_string(),
        qr_service_url: "https://qr.test".to_string(),
    }
}

fn test_state_with(approve_payments: bool) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    let (changes_tx, _) = broadcast::channel(64);
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        payments: Box::new(MockPayments {
            approve: approve_payments,
        }),
        qr: Box::new(MockQr),
        changes_tx,
    })
}

fn test_state() -> Arc<AppState> {
    test_state_with(true)
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/courts", get(handlers::courts::list_courts))
        .route("/api/courts", post(handlers::courts::create_court))
        .route("/api/courts/:id", get(handlers::courts::get_court))
        .route("/api/courts/:id", patch(handlers::courts::update_court))
        .route("/api/courts/:id", delete(handlers::courts::delete_court))
        .route(
            "/api/courts/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route(
            "/api/bookings/code/:code",
            get(handlers::bookings::lookup_by_code),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id",
            patch(handlers::bookings::update_booking),
        )
        .route(
            "/api/bookings/:id",
            delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/void",
            post(handlers::bookings::void_booking),
        )
        .route(
            "/api/bookings/:id/validate",
            post(handlers::bookings::validate_booking),
        )
        .route(
            "/api/users/:id/bookings",
            get(handlers::bookings::get_user_bookings),
        )
        .route(
            "/api/users/:id/notifications",
            get(handlers::notifications::get_user_notifications),
        )
        .route("/api/revenue", get(handlers::revenue::get_revenue))
        .with_state(state)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Court priced at 20000 per hour, seeded directly through the store.
fn seed_court(state: &Arc<AppState>) -> i64 {
    let db = state.db.lock().unwrap();
    queries::create_court(&db, "Court 1", "padel", "North wing", 20000, CourtStatus::Active)
        .unwrap()
        .id
}

fn day() -> &'static str {
    "2030-06-15"
}

fn booking_body(court_id: i64, time: &str) -> serde_json::Value {
    serde_json::json!({
        "user_id": "11.111.111-1",
        "court_id": court_id,
        "date": day(),
        "start_time": time,
        "method": "cash",
    })
}

async fn create_booking(state: &Arc<AppState>, court_id: i64, time: &str) -> serde_json::Value {
    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/api/bookings", booking_body(court_id, time)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

/// Inserts a booking row directly, bypassing payment. Used for states the
/// public API does not produce, like pending.
fn seed_booking(state: &Arc<AppState>, court_id: i64, time: &str, status: BookingStatus) -> String {
    let now = Utc::now().naive_utc();
    let start = NaiveTime::parse_from_str(time, "%H:%M").unwrap();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: "22.222.222-2".to_string(),
        court_id,
        date: NaiveDate::parse_from_str(day(), "%Y-%m-%d").unwrap(),
        start_time: start,
        end_time: courtbook::models::slot::slot_end_time(start),
        status,
        code: format!("SD{}", start.format("%H%M")),
        qr_ref: None,
        created_at: now,
        updated_at: now,
    };
    let db = state.db.lock().unwrap();
    queries::insert_booking(&db, &booking).unwrap();
    booking.id
}

async fn slot_available(state: &Arc<AppState>, court_id: i64, time: &str) -> bool {
    let res = test_app(state.clone())
        .oneshot(get_request(&format!(
            "/api/courts/{court_id}/availability?date={}",
            day()
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let slots = body_json(res).await;
    let wanted = format!("{time}:00");
    slots
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["start_time"] == wanted.as_str())
        .map(|s| s["available"].as_bool().unwrap())
        .unwrap()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let res = test_app(test_state())
        .oneshot(get_request("/health"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Courts ──

#[tokio::test]
async fn test_court_crud() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/api/courts",
            serde_json::json!({
                "name": "Center court",
                "kind": "tennis",
                "location": "Main hall",
                "hourly_price": 15000,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let court = body_json(res).await;
    assert_eq!(court["status"], "active");
    let id = court["id"].as_i64().unwrap();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "PATCH",
            &format!("/api/courts/{id}"),
            serde_json::json!({"hourly_price": 18000, "status": "under_maintenance"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let court = body_json(res).await;
    assert_eq!(court["hourly_price"], 18000);
    assert_eq!(court["status"], "under_maintenance");

    // Active filter hides it now
    let res = test_app(state.clone())
        .oneshot(get_request("/api/courts?active=true"))
        .await
        .unwrap();
    assert!(body_json(res).await.as_array().unwrap().is_empty());

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/courts/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(get_request(&format!("/api/courts/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_on_maintenance_court_rejected() {
    let state = test_state();
    let court_id = {
        let db = state.db.lock().unwrap();
        queries::create_court(&db, "Closed", "padel", "", 10000, CourtStatus::UnderMaintenance)
            .unwrap()
            .id
    };

    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            booking_body(court_id, "18:00"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Availability ──

#[tokio::test]
async fn test_open_day_offers_eight_slots_with_midnight_wrap() {
    let state = test_state();
    let court_id = seed_court(&state);

    let res = test_app(state)
        .oneshot(get_request(&format!(
            "/api/courts/{court_id}/availability?date={}",
            day()
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let slots = body_json(res).await;
    let slots = slots.as_array().unwrap();

    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0]["start_time"], "16:00:00");
    assert_eq!(slots[7]["start_time"], "23:00:00");
    assert_eq!(slots[7]["end_time"], "00:00:00");
    assert!(slots.iter().all(|s| s["available"] == true));
}

#[tokio::test]
async fn test_unknown_court_has_no_availability() {
    let state = test_state();

    let res = test_app(state)
        .oneshot(get_request(&format!(
            "/api/courts/999/availability?date={}",
            day()
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["kind"], "not_found");
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_takes_slot() {
    let state = test_state();
    let court_id = seed_court(&state);

    let booking = create_booking(&state, court_id, "18:00").await;
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["end_time"], "19:00:00");
    let code = booking["code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    assert!(!slot_available(&state, court_id, "18:00").await);
    assert!(slot_available(&state, court_id, "19:00").await);
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let state = test_state();
    let court_id = seed_court(&state);

    create_booking(&state, court_id, "18:00").await;

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            booking_body(court_id, "18:00"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["kind"], "slot_unavailable");

    // Same slot on another court is independent
    let other_court = {
        let db = state.db.lock().unwrap();
        queries::create_court(&db, "Court 2", "padel", "", 20000, CourtStatus::Active)
            .unwrap()
            .id
    };
    create_booking(&state, other_court, "18:00").await;
}

#[tokio::test]
async fn test_past_and_off_catalogue_slots_rejected() {
    let state = test_state();
    let court_id = seed_court(&state);

    let mut past = booking_body(court_id, "18:00");
    past["date"] = serde_json::json!("2020-01-01");
    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/api/bookings", past))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // 16:30 is not an offered start time
    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            booking_body(court_id, "16:30"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_online_payment_records_transaction() {
    let state = test_state();
    let court_id = seed_court(&state);

    let mut body = booking_body(court_id, "20:00");
    body["method"] = serde_json::json!("online");
    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/api/bookings", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let booking = body_json(res).await;

    let db = state.db.lock().unwrap();
    let payment = queries::get_payment_by_booking(&db, booking["id"].as_str().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(payment.amount, 20000);
    assert_eq!(payment.method, "online");
    assert_eq!(payment.status, PaymentStatus::Processed);
    assert_eq!(payment.transaction_ref.as_deref(), Some("tx-20000"));
}

#[tokio::test]
async fn test_declined_payment_leaves_slot_open() {
    let state = test_state_with(false);
    let court_id = seed_court(&state);

    let mut body = booking_body(court_id, "20:00");
    body["method"] = serde_json::json!("online");
    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/api/bookings", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(res).await["kind"], "payment_failed");

    assert!(slot_available(&state, court_id, "20:00").await);
}

// ── Lifecycle transitions ──

#[tokio::test]
async fn test_cancel_only_from_pending() {
    let state = test_state();
    let court_id = seed_court(&state);

    // Confirmed bookings cannot be self-cancelled
    let booking = create_booking(&state, court_id, "18:00").await;
    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{}/cancel", booking["id"].as_str().unwrap()),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["kind"], "invalid_transition");

    let pending_id = seed_booking(&state, court_id, "19:00", BookingStatus::Pending);
    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{pending_id}/cancel"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    // Cancellation released the slot
    assert!(slot_available(&state, court_id, "19:00").await);
}

#[tokio::test]
async fn test_validate_marks_realized_once() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/validate"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "realized");

    // Realized still blocks the slot
    assert!(!slot_available(&state, court_id, "18:00").await);

    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/validate"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["kind"], "already_validated");
}

#[tokio::test]
async fn test_cancelled_booking_not_validatable() {
    let state = test_state();
    let court_id = seed_court(&state);
    let id = seed_booking(&state, court_id, "19:00", BookingStatus::Cancelled);

    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/validate"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["kind"], "not_validatable");
}

#[tokio::test]
async fn test_terminal_states_reject_further_edits() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();

    test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "rain", "refund_required": false}),
        ))
        .await
        .unwrap();

    // Status edit on a voided booking
    let res = test_app(state.clone())
        .oneshot(json_request(
            "PATCH",
            &format!("/api/bookings/{id}"),
            serde_json::json!({"status": "confirmed"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["kind"], "invalid_transition");

    // Slot edit on a voided booking
    let res = test_app(state)
        .oneshot(json_request(
            "PATCH",
            &format!("/api/bookings/{id}"),
            serde_json::json!({"start_time": "21:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Edits ──

#[tokio::test]
async fn test_edit_moves_slot() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "PATCH",
            &format!("/api/bookings/{id}"),
            serde_json::json!({"start_time": "19:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body_json(res).await;
    assert_eq!(updated["start_time"], "19:00:00");
    assert_eq!(updated["end_time"], "20:00:00");

    assert!(slot_available(&state, court_id, "18:00").await);
    assert!(!slot_available(&state, court_id, "19:00").await);
}

#[tokio::test]
async fn test_edit_into_taken_slot_conflicts() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    create_booking(&state, court_id, "19:00").await;

    let res = test_app(state)
        .oneshot(json_request(
            "PATCH",
            &format!("/api/bookings/{}", booking["id"].as_str().unwrap()),
            serde_json::json!({"start_time": "19:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_edit_keeping_own_slot_is_allowed() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;

    // Re-sending the current slot must not collide with itself
    let res = test_app(state)
        .oneshot(json_request(
            "PATCH",
            &format!("/api/bookings/{}", booking["id"].as_str().unwrap()),
            serde_json::json!({"start_time": "18:00", "date": day()}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Void and refund ──

#[tokio::test]
async fn test_void_with_refund_reverses_ledger() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "client request", "refund_required": true}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    {
        let db = state.db.lock().unwrap();
        let record = queries::get_void_record(&db, id).unwrap().unwrap();
        assert!(record.refund_required);
        assert_eq!(record.refund_amount, Some(20000));

        let payment = queries::get_payment_by_booking(&db, id).unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Reversed);

        // Sale and refund cancel out
        let totals = queries::period_totals(&db, &queries::current_period()).unwrap();
        assert_eq!(totals.bookings, 0);
        assert_eq!(totals.amount, 0);
    }

    // Slot is open again
    assert!(slot_available(&state, court_id, "18:00").await);

    // A completed void is terminal
    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "again", "refund_required": true}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_void_requires_reason() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;

    let res = test_app(state)
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{}/void", booking["id"].as_str().unwrap()),
            serde_json::json!({"reason": "  ", "refund_required": false}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["kind"], "missing_reason");
}

#[tokio::test]
async fn test_refund_without_payment_rejected_before_status_change() {
    let state = test_state();
    let court_id = seed_court(&state);
    let id = seed_booking(&state, court_id, "19:00", BookingStatus::Confirmed);

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "mistake", "refund_required": true}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // The booking must not have been flipped
    let db = state.db.lock().unwrap();
    let booking = queries::get_booking(&db, &id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_void_reconciliation_completes_missing_ledger() {
    let state = test_state();
    let court_id = seed_court(&state);
    // Voided booking whose ledger stage never ran
    let id = seed_booking(&state, court_id, "19:00", BookingStatus::Voided);

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "reconciliation", "refund_required": false}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    assert!(queries::get_void_record(&db, &id).unwrap().is_some());
}

// ── Lookup, history, revenue ──

#[tokio::test]
async fn test_code_lookup_reports_eligibility() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();
    let code = booking["code"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(get_request(&format!("/api/bookings/code/{code}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let found = body_json(res).await;
    assert_eq!(found["booking"]["id"], id);
    assert!(found["message"].is_null());

    test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/validate"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    let res = test_app(state.clone())
        .oneshot(get_request(&format!("/api/bookings/code/{code}")))
        .await
        .unwrap();
    let found = body_json(res).await;
    assert!(found["message"]
        .as_str()
        .unwrap()
        .contains("already been validated"));

    let res = test_app(state)
        .oneshot(get_request("/api/bookings/code/ZZZZZZ"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_history_and_notifications() {
    let state = test_state();
    let court_id = seed_court(&state);
    create_booking(&state, court_id, "18:00").await;
    create_booking(&state, court_id, "19:00").await;

    let res = test_app(state.clone())
        .oneshot(get_request("/api/users/11.111.111-1/bookings"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);

    let res = test_app(state)
        .oneshot(get_request("/api/users/11.111.111-1/notifications"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let notifications = body_json(res).await;
    let notifications = notifications.as_array().unwrap().clone();
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .all(|n| n["title"] == "Booking confirmed"));
}

#[tokio::test]
async fn test_revenue_tracks_sales_per_period() {
    let state = test_state();
    let court_id = seed_court(&state);
    create_booking(&state, court_id, "18:00").await;
    create_booking(&state, court_id, "19:00").await;

    let period = queries::current_period();
    let res = test_app(state.clone())
        .oneshot(get_request(&format!("/api/revenue?period={period}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let totals = body_json(res).await;
    assert_eq!(totals["bookings"], 2);
    assert_eq!(totals["amount"], 40000);

    // Malformed period
    let res = test_app(state)
        .oneshot(get_request("/api/revenue?period=202406"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_booking_frees_slot() {
    let state = test_state();
    let court_id = seed_court(&state);
    let booking = create_booking(&state, court_id, "18:00").await;
    let id = booking["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/bookings/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(slot_available(&state, court_id, "18:00").await);

    let res = test_app(state)
        .oneshot(get_request(&format!("/api/bookings/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_booking_day() {
    let state = test_state();
    let court_id = {
        let db = state.db.lock().unwrap();
        queries::create_court(&db, "5-a-side #1", "football", "", 20000, CourtStatus::Active)
            .unwrap()
            .id
    };

    // Empty day: everything open
    assert!(slot_available(&state, court_id, "16:00").await);
    assert!(slot_available(&state, court_id, "23:00").await);

    // First client takes 18:00
    let booking = create_booking(&state, court_id, "18:00").await;
    assert!(!slot_available(&state, court_id, "18:00").await);
    assert!(slot_available(&state, court_id, "19:00").await);

    // Second client loses the race for it
    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            booking_body(court_id, "18:00"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Staff void with refund reopens the slot and balances the ledger
    let id = booking["id"].as_str().unwrap();
    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{id}/void"),
            serde_json::json!({"reason": "client cancelled", "refund_required": true}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(slot_available(&state, court_id, "18:00").await);

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking(&db, id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Voided);
    assert!(queries::get_void_record(&db, id).unwrap().is_some());
    assert_eq!(queries::revenue_entries_for_booking(&db, id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_availability_events_follow_booking_changes() {
    let state = test_state();
    let court_id = seed_court(&state);
    let mut rx = state.changes_tx.subscribe();

    let booking = create_booking(&state, court_id, "18:00").await;
    let change = rx.recv().await.unwrap();
    assert_eq!(change.court_id, court_id);
    assert_eq!(change.date.to_string(), day());

    test_app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/api/bookings/{}/void", booking["id"].as_str().unwrap()),
            serde_json::json!({"reason": "rain", "refund_required": false}),
        ))
        .await
        .unwrap();
    let change = rx.recv().await.unwrap();
    assert_eq!(change.court_id, court_id);
}
