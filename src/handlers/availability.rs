use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::TimeSlot;
use crate::services::availability::compute_availability;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

// GET /api/courts/:id/availability?date=YYYY-MM-DD
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(court_id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let db = state.db.lock().unwrap();
    // An unknown court has no slots to offer; never speculate.
    queries::get_court(&db, court_id)?
        .ok_or_else(|| AppError::NotFound(format!("court {court_id}")))?;
    let slots = compute_availability(&db, court_id, query.date, Utc::now().naive_utc())?;
    Ok(Json(slots))
}

fn snapshot_event(state: &Arc<AppState>, court_id: i64, date: NaiveDate) -> Option<Event> {
    let slots = {
        let db = state.db.lock().unwrap();
        match compute_availability(&db, court_id, date, Utc::now().naive_utc()) {
            Ok(slots) => slots,
            Err(e) => {
                tracing::error!(error = %e, court_id, %date, "failed to compute availability");
                return None;
            }
        }
    };
    let data = serde_json::to_string(&serde_json::json!({
        "court_id": court_id,
        "date": date,
        "slots": slots,
    }))
    .unwrap_or_default();
    Some(Event::default().data(data).event("availability"))
}

// GET /api/courts/:id/availability/stream?date=YYYY-MM-DD — SSE stream.
//
// Emits a full slot snapshot immediately, then a fresh snapshot after every
// booking change touching this (court, date) pair. Lagged subscribers drop
// intermediate updates; the next change resynchronizes them.
pub async fn availability_stream(
    State(state): State<Arc<AppState>>,
    Path(court_id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let date = query.date;
    {
        let db = state.db.lock().unwrap();
        queries::get_court(&db, court_id)?
            .ok_or_else(|| AppError::NotFound(format!("court {court_id}")))?;
    }
    let rx = state.changes_tx.subscribe();

    let initial = tokio_stream::iter(
        snapshot_event(&state, court_id, date)
            .into_iter()
            .map(Ok::<_, Infallible>),
    );

    let live_state = state.clone();
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(change) if change.court_id == court_id && change.date == date => {
            snapshot_event(&live_state, court_id, date).map(Ok)
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => {
            snapshot_event(&live_state, court_id, date).map(Ok)
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = initial.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
