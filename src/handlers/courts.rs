use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries::{self, CourtUpdate};
use crate::errors::AppError;
use crate::models::{Court, CourtStatus};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListCourtsQuery {
    pub active: Option<bool>,
}

// GET /api/courts
pub async fn list_courts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCourtsQuery>,
) -> Result<Json<Vec<Court>>, AppError> {
    let db = state.db.lock().unwrap();
    let courts = queries::list_courts(&db, query.active.unwrap_or(false))?;
    Ok(Json(courts))
}

// GET /api/courts/:id
pub async fn get_court(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Court>, AppError> {
    let db = state.db.lock().unwrap();
    let court =
        queries::get_court(&db, id)?.ok_or_else(|| AppError::NotFound(format!("court {id}")))?;
    Ok(Json(court))
}

#[derive(Deserialize)]
pub struct CreateCourtRequest {
    pub name: String,
    pub kind: String,
    pub location: String,
    pub hourly_price: i64,
    pub status: Option<String>,
}

// POST /api/courts
pub async fn create_court(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCourtRequest>,
) -> Result<Json<Court>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if body.hourly_price < 0 {
        return Err(AppError::BadRequest(
            "hourly_price must not be negative".to_string(),
        ));
    }
    let status = match body.status.as_deref() {
        Some(s) => CourtStatus::parse(s)
            .ok_or_else(|| AppError::BadRequest(format!("unknown court status: {s}")))?,
        None => CourtStatus::Active,
    };

    let db = state.db.lock().unwrap();
    let court = queries::create_court(
        &db,
        body.name.trim(),
        &body.kind,
        &body.location,
        body.hourly_price,
        status,
    )?;
    tracing::info!(court_id = court.id, name = %court.name, "court created");
    Ok(Json(court))
}

#[derive(Deserialize, Default)]
pub struct UpdateCourtRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub location: Option<String>,
    pub hourly_price: Option<i64>,
    pub status: Option<String>,
}

// PATCH /api/courts/:id
pub async fn update_court(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCourtRequest>,
) -> Result<Json<Court>, AppError> {
    let status = match body.status.as_deref() {
        Some(s) => Some(
            CourtStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown court status: {s}")))?,
        ),
        None => None,
    };
    if let Some(price) = body.hourly_price {
        if price < 0 {
            return Err(AppError::BadRequest(
                "hourly_price must not be negative".to_string(),
            ));
        }
    }

    let changes = CourtUpdate {
        name: body.name,
        kind: body.kind,
        location: body.location,
        hourly_price: body.hourly_price,
        status,
    };

    let db = state.db.lock().unwrap();
    if !queries::update_court(&db, id, &changes)? {
        return Err(AppError::NotFound(format!("court {id}")));
    }
    let court =
        queries::get_court(&db, id)?.ok_or_else(|| AppError::NotFound(format!("court {id}")))?;
    Ok(Json(court))
}

// DELETE /api/courts/:id
pub async fn delete_court(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    if !queries::delete_court(&db, id)? {
        return Err(AppError::NotFound(format!("court {id}")));
    }
    tracing::info!(court_id = id, "court deleted");
    Ok(Json(serde_json::json!({"ok": true})))
}
