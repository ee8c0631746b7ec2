use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, error, info};

use crate::services::inventory::InventoryService;
use crate::AppState;

/// Background reclamation sweeps.
///
/// Both jobs are set-based conditional updates whose predicates exclude rows
/// a user action has already moved on, so they run safely against live
/// traffic, against each other, and across multiple server instances. They
/// log their counts and never surface errors to users.
pub struct SweeperService {
    state: Arc<AppState>,
}

impl SweeperService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Spawns both sweep loops with their configured cadences.
    pub fn spawn(state: Arc<AppState>) {
        let lock_interval = state.config.booking.lock_sweep_interval_secs;
        let booking_interval = state.config.booking.booking_sweep_interval_secs;

        let sweeper = SweeperService::new(state.clone());
        task::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(lock_interval));
            loop {
                ticker.tick().await;
                sweeper.run_lock_sweep().await;
            }
        });

        let sweeper = SweeperService::new(state);
        task::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(booking_interval));
            loop {
                ticker.tick().await;
                sweeper.run_booking_sweep().await;
            }
        });

        info!(
            "sweepers started (locks every {}s, bookings every {}s)",
            lock_interval, booking_interval
        );
    }

    /// Returns expired seat locks to AVAILABLE. The sweep, not the original
    /// holder, is the only path that reclaims a lock.
    pub async fn run_lock_sweep(&self) {
        let inventory = InventoryService::new(self.state.clone());
        match inventory.release_expired_locks(Utc::now()).await {
            Ok(0) => debug!("lock sweep: nothing to release"),
            Ok(count) => info!("lock sweep: released {} expired seat locks", count),
            Err(e) => error!("lock sweep failed: {:?}", e),
        }
    }

    /// Marks CONFIRMED bookings whose showtime has ended as EXPIRED. The
    /// inventory rows stay BOOKED; the seat really was occupied, only the
    /// booking record stops counting as active.
    pub async fn run_booking_sweep(&self) {
        let result = sqlx::query(
            "UPDATE bookings b
             SET status = 'EXPIRED'
             FROM showtimes st
             WHERE st.id = b.showtime_id
               AND b.status = 'CONFIRMED'
               AND st.ends_at < $1",
        )
        .bind(Utc::now())
        .execute(&self.state.db.pool)
        .await;

        match result.map(|r| r.rows_affected()) {
            Ok(0) => debug!("booking sweep: nothing to expire"),
            Ok(count) => info!("booking sweep: marked {} old bookings as EXPIRED", count),
            Err(e) => error!("booking sweep failed: {:?}", e),
        }
    }
}
