use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Used,
}

/// The transitions a booking can be asked to make after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Confirm,
    Cancel,
    CheckIn,
    Expire,
}

impl BookingStatus {
    /// The booking state machine. Anything not listed here is rejected with
    /// an InvalidState error naming the current state and the action.
    pub fn permits(self, action: BookingAction) -> bool {
        matches!(
            (self, action),
            (BookingStatus::Pending, BookingAction::Confirm)
                | (BookingStatus::Confirmed, BookingAction::Cancel)
                | (BookingStatus::Confirmed, BookingAction::CheckIn)
                | (BookingStatus::Confirmed, BookingAction::Expire)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Expired | BookingStatus::Used
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "line_item_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LineItemKind {
    Seat,
    Fee,
}

/// A user's claim on a set of inventory rows for one showtime. Bookings are
/// never deleted; cancellation and expiry are states, which keeps the refund
/// and check-in history auditable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    /// Opaque reference safe to expose externally (QR codes, gateway calls).
    pub public_reference: Uuid,
    pub user_id: i32,
    pub showtime_id: i64,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingLineItem {
    pub id: i64,
    pub booking_id: i64,
    pub description: String,
    /// Minor currency units.
    pub amount: i64,
    pub kind: LineItemKind,
}

/// Local record of the external payment's life. Always 1:1 with a booking,
/// created in the same transaction.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub gateway_reference: String,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingAction::*;
    use BookingStatus::*;

    #[test]
    fn pending_only_permits_confirm() {
        assert!(Pending.permits(Confirm));
        assert!(!Pending.permits(Cancel));
        assert!(!Pending.permits(CheckIn));
        assert!(!Pending.permits(Expire));
    }

    #[test]
    fn confirmed_permits_cancel_checkin_expire_but_not_confirm() {
        assert!(Confirmed.permits(Cancel));
        assert!(Confirmed.permits(CheckIn));
        assert!(Confirmed.permits(Expire));
        assert!(!Confirmed.permits(Confirm));
    }

    #[test]
    fn terminal_states_permit_nothing() {
        for status in [Cancelled, Expired, Used] {
            assert!(status.is_terminal());
            for action in [Confirm, Cancel, CheckIn, Expire] {
                assert!(
                    !status.permits(action),
                    "{status:?} must not permit {action:?}"
                );
            }
        }
    }

    #[test]
    fn active_states_are_not_terminal() {
        assert!(!Pending.is_terminal());
        assert!(!Confirmed.is_terminal());
    }
}
