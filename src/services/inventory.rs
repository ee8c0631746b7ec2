use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{BookingError, Result};
use crate::models::{SeatStatus, ShowtimeSeat};
use crate::AppState;

/// Seat inventory and locking engine. Arbitrates concurrent claims on
/// inventory rows; at most one holder at a time, enforced by the version
/// column rather than by row locks held across user think-time.
pub struct InventoryService {
    state: Arc<AppState>,
}

/// One inventory row as shown to clients browsing a showtime.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SeatListing {
    pub id: i64,
    pub seat_row: String,
    pub seat_number: i32,
    pub status: SeatStatus,
}

impl InventoryService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Phase 1 of booking: claim a single seat for `holder`.
    ///
    /// Read the row, then issue a conditional update keyed on the version we
    /// read. If another request moved the row in between, zero rows match and
    /// the caller gets a Conflict; nothing is ever silently overwritten. No
    /// retry happens here — the client must re-fetch inventory and decide.
    pub async fn acquire_lock(&self, showtime_seat_id: i64, holder: i32) -> Result<()> {
        let seat = sqlx::query_as::<_, ShowtimeSeat>(
            "SELECT id, showtime_id, seat_id, status, version,
                    lock_expires_at, locked_by_user_id, booking_id
             FROM showtime_seats WHERE id = $1",
        )
        .bind(showtime_seat_id)
        .fetch_optional(&self.state.db.pool)
        .await?
        .ok_or(BookingError::NotFound("seat"))?;

        if seat.status != SeatStatus::Available {
            return Err(BookingError::Conflict(
                "Seat is not available or does not exist".to_string(),
            ));
        }

        let expires_at = Utc::now() + Duration::minutes(self.state.config.booking.seat_lock_ttl_minutes);

        let affected = sqlx::query(
            "UPDATE showtime_seats
             SET status = 'LOCKED',
                 locked_by_user_id = $2,
                 lock_expires_at = $3,
                 version = version + 1
             WHERE id = $1 AND status = 'AVAILABLE' AND version = $4",
        )
        .bind(showtime_seat_id)
        .bind(holder)
        .bind(expires_at)
        .bind(seat.version)
        .execute(&self.state.db.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            warn!(
                "optimistic lock lost on seat {} for user {}",
                showtime_seat_id, holder
            );
            return Err(BookingError::Conflict(
                "Seat was just locked by another user. Please try again.".to_string(),
            ));
        }

        info!("locked seat {} for user {}", showtime_seat_id, holder);
        Ok(())
    }

    /// Resets every lock that has outlived its TTL back to AVAILABLE.
    ///
    /// Set-based on purpose: the predicate (LOCKED and expired) is itself the
    /// concurrency guard. A row that moved to BOOKED, or was freshly
    /// re-locked, no longer matches and cannot be clobbered. Returns the
    /// number of rows released, for the sweep's log line only.
    pub async fn release_expired_locks(&self, now: DateTime<Utc>) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE showtime_seats
             SET status = 'AVAILABLE',
                 locked_by_user_id = NULL,
                 lock_expires_at = NULL,
                 version = version + 1
             WHERE status = 'LOCKED' AND lock_expires_at < $1",
        )
        .bind(now)
        .execute(&self.state.db.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    /// Inventory listing for one showtime, ordered for display.
    pub async fn seats_for_showtime(&self, showtime_id: i64) -> Result<Vec<SeatListing>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM showtimes WHERE id = $1)")
                .bind(showtime_id)
                .fetch_one(&self.state.db.pool)
                .await?;
        if !exists {
            return Err(BookingError::NotFound("showtime"));
        }

        let seats = sqlx::query_as::<_, SeatListing>(
            "SELECT ss.id, s.seat_row, s.seat_number, ss.status
             FROM showtime_seats ss
             JOIN seats s ON s.id = ss.seat_id
             WHERE ss.showtime_id = $1
             ORDER BY s.seat_row, s.seat_number",
        )
        .bind(showtime_id)
        .fetch_all(&self.state.db.pool)
        .await?;

        Ok(seats)
    }

    /// Creates one AVAILABLE, version-0 inventory row per physical seat on
    /// the showtime's screen. Idempotent: rows that already exist are left
    /// alone. Scheduling itself is a catalog concern; this only gives the
    /// locking engine something to lock.
    pub async fn materialize(&self, showtime_id: i64) -> Result<u64> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM showtimes WHERE id = $1)")
                .bind(showtime_id)
                .fetch_one(&self.state.db.pool)
                .await?;
        if !exists {
            return Err(BookingError::NotFound("showtime"));
        }

        let created = sqlx::query(
            "INSERT INTO showtime_seats (showtime_id, seat_id, status, version)
             SELECT st.id, s.id, 'AVAILABLE', 0
             FROM showtimes st
             JOIN seats s ON s.screen_id = st.screen_id
             WHERE st.id = $1
             ON CONFLICT (showtime_id, seat_id) DO NOTHING",
        )
        .bind(showtime_id)
        .execute(&self.state.db.pool)
        .await?
        .rows_affected();

        info!(
            "materialized {} inventory rows for showtime {}",
            created, showtime_id
        );
        Ok(created)
    }
}
