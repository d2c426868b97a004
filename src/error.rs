use thiserror::Error;

use crate::models::{BookingId, BookingStatus, Money, SeatPosition, ShowingId};

/// Ошибки слоя хранения. Два конфликтных варианта сервисы переводят
/// в доменные ошибки, всё остальное уходит наверх как инфраструктурный сбой.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seat {0} is not free")]
    SeatUnavailable(SeatPosition),

    #[error("booking {0} already has a payment")]
    DuplicatePayment(BookingId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("showing {0} not found")]
    ShowingNotFound(ShowingId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("seat {0} is not available")]
    SeatsUnavailable(SeatPosition),

    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("cannot {action} booking {id}: booking is already '{status}'")]
    InvalidState {
        id: BookingId,
        status: BookingStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatUnavailable(position) => BookingError::SeatsUnavailable(position),
            other => BookingError::Store(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Money, actual: Money },

    #[error("booking {0} is already paid")]
    DuplicatePayment(BookingId),

    #[error("cannot pay for booking {id}: booking is already '{status}'")]
    InvalidState { id: BookingId, status: BookingStatus },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PaymentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePayment(id) => PaymentError::DuplicatePayment(id),
            other => PaymentError::Store(other),
        }
    }
}
