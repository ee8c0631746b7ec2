//! Payment confirmation coordinator.
//!
//! The gateway here is an in-process stand-in: it validates the instrument
//! synchronously and reports SUCCESS or FAILED with a reason code. On success
//! it drives the booking lifecycle through `confirm_payment_and_booking`. On
//! failure the booking stays PENDING and its seats stay BOOKED; only the
//! booking sweep eventually closes such bookings out.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{BookingError, Result};
use crate::models::{BookingAction, PaymentStatus};
use crate::services::booking::BookingService;
use crate::AppState;

/// Instrument details as submitted to the payment boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
}

/// Synchronous outcome returned to the caller.
#[derive(Debug, Serialize)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub gateway_reference: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub error_code: Option<&'static str>,
    pub message: &'static str,
}

/// Validates the card the way the gateway stand-in does: 13-19 digits after
/// stripping spaces, a non-past expiry, and a 3-4 digit CVV. Returns a
/// gateway reason code on failure.
pub fn validate_card(card: &CardDetails, now: DateTime<Utc>) -> std::result::Result<(), &'static str> {
    let digits: String = card.card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() < 13 || digits.len() > 19 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("card_declined");
    }

    let (Ok(exp_month), Ok(exp_year)) = (
        card.expiry_month.parse::<u32>(),
        card.expiry_year.parse::<u32>(),
    ) else {
        return Err("card_expired");
    };
    if exp_month < 1 || exp_month > 12 {
        return Err("card_expired");
    }
    let current_year = now.year() as u32 % 100;
    let current_month = now.month();
    if exp_year < current_year || (exp_year == current_year && exp_month < current_month) {
        return Err("card_expired");
    }

    if card.cvv.len() < 3 || card.cvv.len() > 4 || !card.cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid_cvv");
    }

    Ok(())
}

pub struct PaymentCoordinator {
    state: Arc<AppState>,
    bookings: BookingService,
}

impl PaymentCoordinator {
    pub fn new(state: Arc<AppState>) -> Self {
        let bookings = BookingService::new(state.clone());
        Self { state, bookings }
    }

    /// Runs one payment attempt for a PENDING booking owned by `user_id`.
    pub async fn process(
        &self,
        reference: Uuid,
        card: &CardDetails,
        user_id: i32,
    ) -> Result<PaymentOutcome> {
        let details = self.bookings.booking_by_reference(reference, user_id).await?;

        if !details.booking.status.permits(BookingAction::Confirm) {
            return Err(BookingError::InvalidState {
                current: details.booking.status,
                action: "pay for",
            });
        }

        let amount = details.payment.amount;
        let currency = details.payment.currency.clone();

        if let Err(code) = validate_card(card, Utc::now()) {
            // Record the failed attempt. The booking stays PENDING with its
            // seats BOOKED; a later attempt may still succeed, and otherwise
            // the booking sweep closes the booking out at showtime end.
            sqlx::query(
                "UPDATE payments SET status = 'FAILED', updated_at = NOW()
                 WHERE booking_id = $1 AND status <> 'SUCCESS'",
            )
            .bind(details.booking.id)
            .execute(&self.state.db.pool)
            .await?;

            warn!(
                "payment failed for booking {} ({}); seats remain held",
                reference, code
            );
            return Ok(PaymentOutcome {
                status: PaymentStatus::Failed,
                gateway_reference: None,
                amount,
                currency,
                method: "card".to_string(),
                error_code: Some(code),
                message: "Invalid card details",
            });
        }

        let gateway_reference = format!("pi_{}", Uuid::new_v4().simple());
        self.bookings
            .confirm_payment_and_booking(reference, &gateway_reference, "card")
            .await?;

        info!(
            "payment successful for booking {}: {}",
            reference, gateway_reference
        );
        Ok(PaymentOutcome {
            status: PaymentStatus::Success,
            gateway_reference: Some(gateway_reference),
            amount,
            currency,
            method: "card".to_string(),
            error_code: None,
            message: "Payment successful",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, month: &str, year: &str, cvv: &str) -> CardDetails {
        CardDetails {
            card_number: number.to_string(),
            expiry_month: month.to_string(),
            expiry_year: year.to_string(),
            cvv: cvv.to_string(),
        }
    }

    // 2023-11-14
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn accepts_a_plain_valid_card() {
        let c = card("4242 4242 4242 4242", "12", "30", "123");
        assert_eq!(validate_card(&c, now()), Ok(()));
    }

    #[test]
    fn rejects_short_and_long_numbers() {
        assert_eq!(
            validate_card(&card("4242", "12", "30", "123"), now()),
            Err("card_declined")
        );
        assert_eq!(
            validate_card(&card("42424242424242424242", "12", "30", "123"), now()),
            Err("card_declined")
        );
    }

    #[test]
    fn rejects_non_numeric_numbers() {
        assert_eq!(
            validate_card(&card("4242abcd42424242", "12", "30", "123"), now()),
            Err("card_declined")
        );
    }

    #[test]
    fn rejects_past_expiry_but_allows_current_month() {
        assert_eq!(
            validate_card(&card("4242424242424242", "10", "23", "123"), now()),
            Err("card_expired")
        );
        assert_eq!(
            validate_card(&card("4242424242424242", "11", "23", "123"), now()),
            Ok(())
        );
    }

    #[test]
    fn rejects_unparseable_expiry() {
        assert_eq!(
            validate_card(&card("4242424242424242", "xx", "30", "123"), now()),
            Err("card_expired")
        );
    }

    #[test]
    fn rejects_bad_cvv() {
        assert_eq!(
            validate_card(&card("4242424242424242", "12", "30", "12"), now()),
            Err("invalid_cvv")
        );
        assert_eq!(
            validate_card(&card("4242424242424242", "12", "30", "12345"), now()),
            Err("invalid_cvv")
        );
        assert_eq!(
            validate_card(&card("4242424242424242", "12", "30", "abc"), now()),
            Err("invalid_cvv")
        );
    }
}
