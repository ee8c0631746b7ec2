use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{BookingError, Result};
use crate::models::{
    Booking, BookingAction, BookingLineItem, BookingStatus, LineItemKind, Payment, Showtime,
};
use crate::AppState;

/// Booking lifecycle manager: turns locked seats into a booking, drives the
/// state machine, and coordinates with payment confirmation and the sweeps.
pub struct BookingService {
    state: Arc<AppState>,
}

/// A booking with everything the API exposes about it.
#[derive(Debug, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub line_items: Vec<BookingLineItem>,
    pub payment: Payment,
    pub seats: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: &'static str,
    pub booking: Booking,
}

/// A line item before it has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub description: String,
    pub amount: i64,
    pub kind: LineItemKind,
}

/// Builds the priced components of a booking: one SEAT item per claimed seat
/// at the showtime price, plus exactly one flat FEE item. The returned total
/// is what the Payment record is created with, so the sum-of-items invariant
/// holds by construction.
pub fn build_line_items(seat_labels: &[String], seat_price: i64, fee: i64) -> (Vec<NewLineItem>, i64) {
    let mut items: Vec<NewLineItem> = seat_labels
        .iter()
        .map(|label| NewLineItem {
            description: format!("Ticket: {label}"),
            amount: seat_price,
            kind: LineItemKind::Seat,
        })
        .collect();
    items.push(NewLineItem {
        description: "Online Booking Fee".to_string(),
        amount: fee,
        kind: LineItemKind::Fee,
    });
    let total = items.iter().map(|i| i.amount).sum();
    (items, total)
}

/// What check-in should do for a booking in `status` whose showtime starts at
/// `starts_at`. Pure so the whole matrix is testable.
pub fn checkin_decision(
    status: BookingStatus,
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> (bool, &'static str) {
    match status {
        BookingStatus::Confirmed => {
            if starts_at <= now + window {
                (true, "Check-in successful.")
            } else {
                (false, "Too early to check in for this showtime.")
            }
        }
        BookingStatus::Used => (false, "This ticket has already been used."),
        BookingStatus::Cancelled => (false, "This booking has been cancelled."),
        BookingStatus::Expired => (false, "This booking has expired."),
        BookingStatus::Pending => (false, "This booking is still pending payment."),
    }
}

/// Seat row as fetched while holding the row locks inside create_booking.
#[derive(Debug, FromRow)]
struct LockedSeat {
    id: i64,
    showtime_id: i64,
    seat_row: String,
    seat_number: i32,
}

impl BookingService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Phase 2 of booking: convert a set of seats LOCKED by `user_id` into a
    /// PENDING booking with line items and a payment record, flipping the
    /// seats to BOOKED.
    ///
    /// This is the central atomicity boundary: everything happens in one
    /// transaction, so a failed precondition leaves no booking, payment,
    /// line item, or seat mutation behind.
    pub async fn create_booking(&self, seat_ids: &[i64], user_id: i32) -> Result<BookingDetails> {
        let unique: HashSet<i64> = seat_ids.iter().copied().collect();
        if unique.len() != seat_ids.len() {
            return Err(BookingError::Validation(
                "Duplicate seat ids in booking request".to_string(),
            ));
        }

        let mut tx = self.state.db.pool.begin().await?;

        // Only rows still LOCKED by this user count; FOR UPDATE pins them for
        // the rest of the transaction so a concurrent sweep or booking cannot
        // move them underneath us.
        let locked: Vec<LockedSeat> = sqlx::query_as(
            "SELECT ss.id, ss.showtime_id, s.seat_row, s.seat_number
             FROM showtime_seats ss
             JOIN seats s ON s.id = ss.seat_id
             WHERE ss.id = ANY($1)
               AND ss.status = 'LOCKED'
               AND ss.locked_by_user_id = $2
             FOR UPDATE OF ss",
        )
        .bind(seat_ids)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if locked.is_empty() {
            warn!("no valid locked seats for user {} in {:?}", user_id, seat_ids);
            return Err(BookingError::Validation(
                "No valid locked seats found. Your session may have expired.".to_string(),
            ));
        }
        if locked.len() != seat_ids.len() {
            warn!(
                "locked-seat shortfall for user {}: expected {}, found {}",
                user_id,
                seat_ids.len(),
                locked.len()
            );
            return Err(BookingError::Validation(
                "Some seats were not locked or do not belong to you.".to_string(),
            ));
        }

        let showtime_ids: HashSet<i64> = locked.iter().map(|s| s.showtime_id).collect();
        if showtime_ids.len() != 1 {
            return Err(BookingError::Validation(
                "All seats in a booking must belong to the same showtime.".to_string(),
            ));
        }
        let showtime_id = locked[0].showtime_id;

        let showtime: Showtime =
            sqlx::query_as("SELECT id, screen_id, price, starts_at, ends_at FROM showtimes WHERE id = $1")
                .bind(showtime_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(BookingError::NotFound("showtime"))?;

        let seat_labels: Vec<String> = locked
            .iter()
            .map(|s| format!("{}{}", s.seat_row, s.seat_number))
            .collect();
        let (items, total) = build_line_items(
            &seat_labels,
            showtime.price,
            self.state.config.booking.booking_fee,
        );

        let booking: Booking = sqlx::query_as(
            "INSERT INTO bookings (public_reference, user_id, showtime_id, status)
             VALUES ($1, $2, $3, 'PENDING')
             RETURNING id, public_reference, user_id, showtime_id, status, booked_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(showtime_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut line_items = Vec::with_capacity(items.len());
        for item in &items {
            let saved: BookingLineItem = sqlx::query_as(
                "INSERT INTO booking_line_items (booking_id, description, amount, kind)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, booking_id, description, amount, kind",
            )
            .bind(booking.id)
            .bind(&item.description)
            .bind(item.amount)
            .bind(item.kind)
            .fetch_one(&mut *tx)
            .await?;
            line_items.push(saved);
        }

        // The gateway reference is a placeholder until the payment boundary
        // reports an outcome.
        let payment: Payment = sqlx::query_as(
            "INSERT INTO payments (booking_id, gateway_reference, amount, currency, method, status)
             VALUES ($1, $2, $3, $4, 'pending', 'PENDING')
             RETURNING id, booking_id, gateway_reference, amount, currency, method, status,
                       created_at, updated_at",
        )
        .bind(booking.id)
        .bind(format!("PENDING_{}", Uuid::new_v4()))
        .bind(total)
        .bind(&self.state.config.booking.currency)
        .fetch_one(&mut *tx)
        .await?;

        let flipped = sqlx::query(
            "UPDATE showtime_seats
             SET status = 'BOOKED',
                 booking_id = $1,
                 locked_by_user_id = NULL,
                 lock_expires_at = NULL,
                 version = version + 1
             WHERE id = ANY($2) AND status = 'LOCKED' AND locked_by_user_id = $3",
        )
        .bind(booking.id)
        .bind(seat_ids)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped != seat_ids.len() as u64 {
            // Dropping the transaction rolls everything back.
            return Err(BookingError::Conflict(
                "Seats changed while booking; please retry.".to_string(),
            ));
        }

        tx.commit().await?;

        info!(
            "booking {} created for user {} with {} seats",
            booking.public_reference,
            user_id,
            seat_labels.len()
        );

        Ok(BookingDetails {
            booking,
            line_items,
            payment,
            seats: seat_labels,
        })
    }

    /// Flips a PENDING booking and its payment to their confirmed states.
    /// Called by the payment boundary once the gateway reports success.
    pub async fn confirm_payment_and_booking(
        &self,
        reference: Uuid,
        gateway_reference: &str,
        method: &str,
    ) -> Result<()> {
        let mut tx = self.state.db.pool.begin().await?;

        let booking: Booking = sqlx::query_as(
            "SELECT id, public_reference, user_id, showtime_id, status, booked_at
             FROM bookings WHERE public_reference = $1 FOR UPDATE",
        )
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound("booking"))?;

        if !booking.status.permits(BookingAction::Confirm) {
            warn!(
                "refusing to confirm booking {} in {:?} state",
                reference, booking.status
            );
            return Err(BookingError::InvalidState {
                current: booking.status,
                action: "confirm",
            });
        }

        sqlx::query(
            "UPDATE payments
             SET status = 'SUCCESS', gateway_reference = $2, method = $3, updated_at = NOW()
             WHERE booking_id = $1",
        )
        .bind(booking.id)
        .bind(gateway_reference)
        .bind(method)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE bookings SET status = 'CONFIRMED' WHERE id = $1")
            .bind(booking.id)
            .execute(&mut *tx)
            .await?;

        // The seats were already flipped to BOOKED at creation; re-assert in
        // case anything drifted.
        sqlx::query(
            "UPDATE showtime_seats
             SET status = 'BOOKED', version = version + 1
             WHERE booking_id = $1 AND status <> 'BOOKED'",
        )
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("payment and booking confirmed for {}", reference);
        Ok(())
    }

    /// Cancels a CONFIRMED booking, releasing its seats straight back to
    /// AVAILABLE. A hard release: no lock period, no grace window.
    pub async fn cancel_booking(&self, reference: Uuid, user_id: i32) -> Result<()> {
        let mut tx = self.state.db.pool.begin().await?;

        let booking: Booking = sqlx::query_as(
            "SELECT id, public_reference, user_id, showtime_id, status, booked_at
             FROM bookings WHERE public_reference = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(reference)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound("booking"))?;

        if !booking.status.permits(BookingAction::Cancel) {
            warn!(
                "refusing to cancel booking {} in {:?} state",
                reference, booking.status
            );
            return Err(BookingError::InvalidState {
                current: booking.status,
                action: "cancel",
            });
        }

        sqlx::query(
            "UPDATE showtime_seats
             SET status = 'AVAILABLE', booking_id = NULL, version = version + 1
             WHERE booking_id = $1 AND status = 'BOOKED'",
        )
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE bookings SET status = 'CANCELLED' WHERE id = $1")
            .bind(booking.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("booking {} cancelled", reference);
        Ok(())
    }

    /// Check-in at the theater door. A CONFIRMED booking inside the check-in
    /// window becomes USED; every other state is reported back without any
    /// state change, so scanning a ticket twice rejects the second scan.
    pub async fn verify_booking(&self, reference: Uuid) -> Result<VerificationResult> {
        let mut tx = self.state.db.pool.begin().await?;

        let booking: Booking = sqlx::query_as(
            "SELECT id, public_reference, user_id, showtime_id, status, booked_at
             FROM bookings WHERE public_reference = $1 FOR UPDATE",
        )
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound("booking"))?;

        let starts_at: DateTime<Utc> =
            sqlx::query_scalar("SELECT starts_at FROM showtimes WHERE id = $1")
                .bind(booking.showtime_id)
                .fetch_one(&mut *tx)
                .await?;

        let window = Duration::minutes(self.state.config.booking.checkin_window_minutes);
        let (valid, message) = checkin_decision(booking.status, starts_at, Utc::now(), window);

        let booking = if valid {
            let updated: Booking = sqlx::query_as(
                "UPDATE bookings SET status = 'USED' WHERE id = $1
                 RETURNING id, public_reference, user_id, showtime_id, status, booked_at",
            )
            .bind(booking.id)
            .fetch_one(&mut *tx)
            .await?;
            info!("booking {} checked in", reference);
            updated
        } else {
            warn!("check-in rejected for booking {}: {}", reference, message);
            booking
        };

        tx.commit().await?;
        Ok(VerificationResult {
            valid,
            message,
            booking,
        })
    }

    /// All bookings belonging to `user_id`, newest first.
    pub async fn my_bookings(&self, user_id: i32) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as(
            "SELECT id, public_reference, user_id, showtime_id, status, booked_at
             FROM bookings WHERE user_id = $1 ORDER BY booked_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.state.db.pool)
        .await?;
        Ok(bookings)
    }

    /// One booking with its line items, payment and seat labels. Scoped to
    /// the owner: a foreign reference reads as NotFound, not Forbidden.
    pub async fn booking_by_reference(
        &self,
        reference: Uuid,
        user_id: i32,
    ) -> Result<BookingDetails> {
        let booking: Booking = sqlx::query_as(
            "SELECT id, public_reference, user_id, showtime_id, status, booked_at
             FROM bookings WHERE public_reference = $1 AND user_id = $2",
        )
        .bind(reference)
        .bind(user_id)
        .fetch_optional(&self.state.db.pool)
        .await?
        .ok_or(BookingError::NotFound("booking"))?;

        let line_items: Vec<BookingLineItem> = sqlx::query_as(
            "SELECT id, booking_id, description, amount, kind
             FROM booking_line_items WHERE booking_id = $1 ORDER BY id",
        )
        .bind(booking.id)
        .fetch_all(&self.state.db.pool)
        .await?;

        let payment: Payment = sqlx::query_as(
            "SELECT id, booking_id, gateway_reference, amount, currency, method, status,
                    created_at, updated_at
             FROM payments WHERE booking_id = $1",
        )
        .bind(booking.id)
        .fetch_one(&self.state.db.pool)
        .await?;

        let seats: Vec<String> = sqlx::query_as::<_, (String, i32)>(
            "SELECT s.seat_row, s.seat_number
             FROM showtime_seats ss
             JOIN seats s ON s.id = ss.seat_id
             WHERE ss.booking_id = $1
             ORDER BY s.seat_row, s.seat_number",
        )
        .bind(booking.id)
        .fetch_all(&self.state.db.pool)
        .await?
        .into_iter()
        .map(|(row, number)| format!("{row}{number}"))
        .collect();

        Ok(BookingDetails {
            booking,
            line_items,
            payment,
            seats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{}", i + 1)).collect()
    }

    #[test]
    fn line_items_cover_each_seat_plus_one_fee() {
        let (items, total) = build_line_items(&labels(3), 25000, 5000);
        assert_eq!(items.len(), 4);
        assert_eq!(
            items.iter().filter(|i| i.kind == LineItemKind::Seat).count(),
            3
        );
        assert_eq!(
            items.iter().filter(|i| i.kind == LineItemKind::Fee).count(),
            1
        );
        assert_eq!(total, 3 * 25000 + 5000);
    }

    #[test]
    fn seat_items_carry_the_seat_label() {
        let (items, _) = build_line_items(&["B7".to_string()], 20000, 5000);
        assert_eq!(items[0].description, "Ticket: B7");
        assert_eq!(items[1].description, "Online Booking Fee");
    }

    proptest! {
        // The invariant behind every booking ever created: the payment amount
        // is exactly the sum of its line items.
        #[test]
        fn total_always_equals_item_sum(
            n in 1usize..=20,
            price in 0i64..1_000_000,
            fee in 0i64..100_000,
        ) {
            let (items, total) = build_line_items(&labels(n), price, fee);
            prop_assert_eq!(items.iter().map(|i| i.amount).sum::<i64>(), total);
            prop_assert_eq!(items.len(), n + 1);
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn checkin_within_window_is_valid() {
        // Showtime starts 45 minutes from now, window is one hour.
        let (valid, message) = checkin_decision(
            BookingStatus::Confirmed,
            t(45 * 60),
            t(0),
            Duration::hours(1),
        );
        assert!(valid);
        assert_eq!(message, "Check-in successful.");
    }

    #[test]
    fn checkin_too_early_is_rejected_without_state_change() {
        let (valid, message) = checkin_decision(
            BookingStatus::Confirmed,
            t(2 * 3600),
            t(0),
            Duration::hours(1),
        );
        assert!(!valid);
        assert_eq!(message, "Too early to check in for this showtime.");
    }

    #[test]
    fn checkin_after_start_is_still_valid() {
        let (valid, _) = checkin_decision(
            BookingStatus::Confirmed,
            t(-600),
            t(0),
            Duration::hours(1),
        );
        assert!(valid);
    }

    #[test]
    fn used_ticket_cannot_check_in_again() {
        let (valid, message) =
            checkin_decision(BookingStatus::Used, t(0), t(0), Duration::hours(1));
        assert!(!valid);
        assert_eq!(message, "This ticket has already been used.");
    }

    #[test]
    fn non_confirmed_states_are_rejected_with_specific_messages() {
        let cases = [
            (BookingStatus::Cancelled, "This booking has been cancelled."),
            (BookingStatus::Expired, "This booking has expired."),
            (BookingStatus::Pending, "This booking is still pending payment."),
        ];
        for (status, expected) in cases {
            let (valid, message) = checkin_decision(status, t(0), t(0), Duration::hours(1));
            assert!(!valid, "{status:?} must not check in");
            assert_eq!(message, expected);
        }
    }
}
