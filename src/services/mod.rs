pub mod seats;
pub mod booking;
pub mod payment;
pub mod cleanup;

pub use seats::SeatService;
pub use booking::BookingService;
pub use payment::PaymentGate;
pub use cleanup::{ExpirySweeper, SweepReport};
