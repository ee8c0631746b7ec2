use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::PaymentStatus;
use crate::services::payment::{CardDetails, PaymentCoordinator};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments/process", post(process_payment))
}

#[derive(Debug, Deserialize)]
struct ProcessPaymentRequest {
    booking_reference: Uuid,
    #[serde(flatten)]
    card: CardDetails,
}

// POST /api/payments/process
async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse> {
    let outcome = PaymentCoordinator::new(state)
        .process(req.booking_reference, &req.card, user.user_id)
        .await?;

    let status = match outcome.status {
        PaymentStatus::Success => StatusCode::OK,
        _ => StatusCode::BAD_REQUEST,
    };
    Ok((status, Json(outcome)))
}
