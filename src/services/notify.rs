use std::sync::Arc;

use crate::db::queries;
use crate::state::AppState;

/// Records a user-visible notification row. Failures are logged, never
/// propagated; a missing notification must not fail the booking operation.
pub fn record_notification(state: &Arc<AppState>, user_id: &str, title: &str, message: &str) {
    let db = state.db.lock().unwrap();
    if let Err(e) = queries::insert_notification(&db, user_id, title, message) {
        tracing::error!(error = %e, user_id, "failed to record notification");
    }
}
