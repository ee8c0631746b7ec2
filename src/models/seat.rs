use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    Available,
    Locked,
    Booked,
}

/// The reservable unit: one row per (showtime, seat).
///
/// Invariants maintained by the inventory service:
/// - `lock_expires_at` and `locked_by_user_id` are set iff status is LOCKED;
/// - `booking_id` is set iff status is BOOKED;
/// - `version` grows by one on every mutation, whatever the path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShowtimeSeat {
    pub id: i64,
    pub showtime_id: i64,
    pub seat_id: i64,
    pub status: SeatStatus,
    pub version: i64,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub locked_by_user_id: Option<i32>,
    pub booking_id: Option<i64>,
}
