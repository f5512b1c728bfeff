use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::state::AppState;

/// Emitted after any write that can affect availability for (court, date):
/// create, edit (old and new slot), cancel, validate, void, delete.
/// Availability subscribers filter on their own pair and recompute.
#[derive(Clone, Debug, Serialize)]
pub struct BookingChange {
    pub court_id: i64,
    pub date: NaiveDate,
}

pub fn publish(state: &Arc<AppState>, court_id: i64, date: NaiveDate) {
    // No receivers is fine; nobody is watching this pair.
    let _ = state.changes_tx.send(BookingChange { court_id, date });
}
