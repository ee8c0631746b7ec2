use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::error::{BookingError, Result};
use crate::middleware::AuthUser;
use crate::services::inventory::InventoryService;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes/{id}/seats", get(get_seats))
        .route("/showtimes/{id}/inventory", post(materialize_inventory))
}

// GET /api/showtimes/{id}/seats
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i64>,
) -> Result<impl IntoResponse> {
    if showtime_id <= 0 {
        return Err(BookingError::Validation("showtime id must be > 0".to_string()));
    }

    let seats = InventoryService::new(state)
        .seats_for_showtime(showtime_id)
        .await?;
    Ok((StatusCode::OK, Json(seats)))
}

// POST /api/showtimes/{id}/inventory
//
// Materializes the inventory rows for a scheduled showtime. Showtime
// scheduling itself belongs to catalog management; this hook only exists so
// the locking engine has rows to work on.
async fn materialize_inventory(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(showtime_id): Path<i64>,
) -> Result<impl IntoResponse> {
    if showtime_id <= 0 {
        return Err(BookingError::Validation("showtime id must be > 0".to_string()));
    }

    let created = InventoryService::new(state).materialize(showtime_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "created": created })),
    ))
}
