use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::BookingStatus;

/// Domain errors for the booking core. Everything a handler can fail with
/// ends up here and is mapped to an HTTP status in one place.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Optimistic-lock collision or a seat that is no longer claimable.
    /// Transient: the caller should re-fetch inventory before retrying.
    #[error("{0}")]
    Conflict(String),

    /// Operation attempted from a lifecycle state that forbids it.
    #[error("cannot {action} booking in {current:?} state")]
    InvalidState {
        current: BookingStatus,
        action: &'static str,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed or incomplete input, e.g. a partial seat-id match.
    #[error("{0}")]
    Validation(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, BookingError>;

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::InvalidState { .. } => StatusCode::CONFLICT,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak sqlx details to clients; the full error is logged here.
        let message = match &self {
            BookingError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "An unexpected internal server error occurred.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_409() {
        let err = BookingError::Conflict("seat unavailable".into());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_state_maps_to_409_and_names_state_and_action() {
        let err = BookingError::InvalidState {
            current: BookingStatus::Cancelled,
            action: "cancel",
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let msg = err.to_string();
        assert!(msg.contains("Cancelled"));
        assert!(msg.contains("cancel"));
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            BookingError::NotFound("booking").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            BookingError::Validation("empty seat list".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn database_maps_to_500() {
        assert_eq!(
            BookingError::Database(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
