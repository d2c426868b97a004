use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::controllers::error::{ApiError, ApiResult};
use crate::models::{
    Booking, BookingDetails, BookingId, BookingStatus, CreateBooking, Money, SeatPosition,
    ShowingId,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(find_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/confirm", patch(confirm_booking))
        .route("/bookings/{id}/cancel", patch(cancel_booking))
        .route("/bookings/{id}/expire", patch(expire_booking))
}

/* ---------- CREATE ---------- */

#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    showing_id: ShowingId,
    // пустые имя и список мест отклоняет сервис после поиска сеанса
    #[validate(length(max = 255, message = "requester must be at most 255 characters"))]
    requester: String,
    #[validate(length(max = 255, message = "contact must be at most 255 characters"))]
    contact: Option<String>,
    #[validate(length(max = 500, message = "too many seats in one request"))]
    seats: Vec<SeatPosition>,
}

impl From<CreateBookingRequest> for CreateBooking {
    fn from(req: CreateBookingRequest) -> Self {
        CreateBooking {
            showing_id: req.showing_id,
            requester: req.requester,
            contact: req.contact,
            seats: req.seats,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateBookingResponse {
    id: BookingId,
    total_price: Money,
    status: BookingStatus,
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let booking = state.bookings.create(req.into()).await?;
    state.cache.invalidate_seats(booking.showing_id).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            id: booking.id,
            total_price: booking.total_price,
            status: booking.status,
        }),
    ))
}

/* ---------- READ ---------- */

#[derive(Debug, Deserialize)]
struct RequesterQuery {
    requester: Option<String>,
}

// GET /api/bookings?requester=
async fn find_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequesterQuery>,
) -> ApiResult<Json<Vec<Booking>>> {
    let requester = query
        .requester
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter 'requester' is required"))?;

    Ok(Json(state.bookings.find_by_requester(requester).await?))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<BookingDetails>> {
    Ok(Json(state.bookings.get(id).await?))
}

/* ---------- TRANSITIONS ---------- */

// PATCH /api/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<Booking>> {
    let booking = state.bookings.confirm(id).await?;
    state.cache.invalidate_seats(booking.showing_id).await;
    Ok(Json(booking))
}

// PATCH /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<Booking>> {
    let booking = state.bookings.cancel(id).await?;
    state.cache.invalidate_seats(booking.showing_id).await;
    Ok(Json(booking))
}

// PATCH /api/bookings/{id}/expire
async fn expire_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<Booking>> {
    let booking = state.bookings.expire(id).await?;
    state.cache.invalidate_seats(booking.showing_id).await;
    Ok(Json(booking))
}
