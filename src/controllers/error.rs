use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{BookingError, PaymentError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

/// Ошибка HTTP-слоя: статус, машинный код и текст для клиента.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        error!("Storage failure while handling request: {}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal storage error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::ShowingNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "showing_not_found", message)
            }
            BookingError::BookingNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "booking_not_found", message)
            }
            BookingError::InvalidRequest(_) => Self::bad_request(message),
            BookingError::SeatsUnavailable(_) => {
                Self::new(StatusCode::CONFLICT, "seats_unavailable", message)
            }
            BookingError::InvalidState { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_state", message)
            }
            BookingError::Store(e) => Self::internal(e),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::BookingNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "booking_not_found", message)
            }
            PaymentError::AmountMismatch { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "amount_mismatch", message)
            }
            PaymentError::DuplicatePayment(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_payment", message)
            }
            PaymentError::InvalidState { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_state", message)
            }
            PaymentError::Store(e) => Self::internal(e),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        warn!("Rejected request body: {}", errors);
        Self::bad_request(errors.to_string())
    }
}
