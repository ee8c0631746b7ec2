pub mod user;
pub mod showtime;
pub mod seat;
pub mod booking;

pub use user::User;
pub use showtime::Showtime;
pub use seat::{SeatStatus, ShowtimeSeat};
pub use booking::{
    Booking, BookingAction, BookingLineItem, BookingStatus, LineItemKind, Payment, PaymentStatus,
};
