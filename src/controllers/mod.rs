pub mod showtimes;
pub mod bookings;
pub mod payments;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(showtimes::routes())
        .merge(bookings::routes())
        .merge(payments::routes())
}
