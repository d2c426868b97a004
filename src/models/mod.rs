pub mod seat;
pub mod showing;
pub mod booking;
pub mod payment;

pub use seat::{Seat, SeatCell, SeatMap, SeatPosition, SeatStatus};
pub use showing::{NewShowing, Showing};
pub use booking::{Booking, BookingDetails, BookingStatus, CreateBooking};
pub use payment::{Payment, PaymentStatus};

pub type ShowingId = i64;
pub type BookingId = uuid::Uuid;
pub type PaymentId = uuid::Uuid;

/// Денежная сумма в минимальных единицах валюты.
pub type Money = i64;
