use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Read model of a scheduled showtime. Catalog management (movies, screens,
/// scheduling) lives elsewhere; the booking core only consumes the seat
/// price and the start/end times.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: i64,
    pub screen_id: i64,
    /// Per-seat price in minor currency units.
    pub price: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
