use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::controllers::error::{ApiError, ApiResult};
use crate::models::{BookingId, Money, Payment};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", post(process_payment))
        .route("/bookings/{id}/payment", get(get_booking_payment))
}

// --- Request структуры ---
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    pub booking_id: BookingId,
    /// Сумма в минимальных единицах валюты.
    #[validate(range(min = 0, message = "amount must not be negative"))]
    pub amount: Money,
}

// --- HTTP Handlers ---

/// POST /api/payments
async fn process_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessPaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let payment = state.payments.process(req.booking_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/bookings/{id}/payment
async fn get_booking_payment(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<Json<Payment>> {
    state
        .payments
        .for_booking(booking_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "payment_not_found",
                format!("booking {} has no payment", booking_id),
            )
        })
}
