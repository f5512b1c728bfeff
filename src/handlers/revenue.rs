use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::PeriodTotals;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RevenueQuery {
    pub period: Option<String>,
}

fn valid_period(period: &str) -> bool {
    let bytes = period.as_bytes();
    bytes.len() == 7
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

// GET /api/revenue?period=YYYY-MM
pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<PeriodTotals>, AppError> {
    let period = query.period.unwrap_or_else(queries::current_period);
    if !valid_period(&period) {
        return Err(AppError::BadRequest(format!(
            "period must be YYYY-MM, got {period}"
        )));
    }

    let db = state.db.lock().unwrap();
    let totals = queries::period_totals(&db, &period)?;
    Ok(Json(totals))
}
