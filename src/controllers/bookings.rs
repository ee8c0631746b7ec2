use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{BookingError, Result};
use crate::middleware::AuthUser;
use crate::services::{booking::BookingService, inventory::InventoryService};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats/lock", post(lock_seat))
        .route("/bookings", post(create_booking))
        .route("/bookings", get(my_bookings))
        .route("/bookings/verify", post(verify_booking))
        .route("/bookings/{reference}", get(get_booking))
        .route("/bookings/{reference}/cancel", post(cancel_booking))
}

/* ---------- SEAT LOCKING ---------- */

#[derive(Debug, Deserialize)]
struct LockSeatRequest {
    showtime_seat_id: i64,
}

// POST /api/seats/lock
async fn lock_seat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<LockSeatRequest>,
) -> Result<impl IntoResponse> {
    if req.showtime_seat_id <= 0 {
        return Err(BookingError::Validation(
            "showtime_seat_id must be > 0".to_string(),
        ));
    }

    InventoryService::new(state)
        .acquire_lock(req.showtime_seat_id, user.user_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Seat locked" })),
    ))
}

/* ---------- BOOKINGS ---------- */

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    showtime_seat_ids: Vec<i64>,
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse> {
    if req.showtime_seat_ids.is_empty() {
        return Err(BookingError::Validation(
            "showtime_seat_ids must not be empty".to_string(),
        ));
    }
    if req.showtime_seat_ids.iter().any(|id| *id <= 0) {
        return Err(BookingError::Validation(
            "showtime_seat_ids must all be > 0".to_string(),
        ));
    }

    let details = BookingService::new(state)
        .create_booking(&req.showtime_seat_ids, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(details)))
}

// GET /api/bookings
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse> {
    let bookings = BookingService::new(state).my_bookings(user.user_id).await?;
    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/bookings/{reference}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(reference): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = BookingService::new(state)
        .booking_by_reference(reference, user.user_id)
        .await?;
    Ok((StatusCode::OK, Json(details)))
}

// POST /api/bookings/{reference}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(reference): Path<Uuid>,
) -> Result<impl IntoResponse> {
    BookingService::new(state)
        .cancel_booking(reference, user.user_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Booking cancelled" })),
    ))
}

/* ---------- CHECK-IN ---------- */

#[derive(Debug, Deserialize)]
struct VerifyBookingRequest {
    reference: Uuid,
}

// POST /api/bookings/verify
async fn verify_booking(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<VerifyBookingRequest>,
) -> Result<impl IntoResponse> {
    let result = BookingService::new(state).verify_booking(req.reference).await?;
    Ok((StatusCode::OK, Json(result)))
}
