use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Notification;
use crate::state::AppState;

// GET /api/users/:id/notifications
pub async fn get_user_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let db = state.db.lock().unwrap();
    let notifications = queries::get_user_notifications(&db, &user_id)?;
    Ok(Json(notifications))
}
