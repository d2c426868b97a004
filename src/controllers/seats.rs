use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::controllers::error::ApiResult;
use crate::models::{SeatPosition, ShowingId};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showings/{id}/seats", get(get_seat_map))
        .route("/showings/{id}/seats/free", get(list_free_seats))
}

// GET /api/showings/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(showing_id): Path<ShowingId>,
) -> ApiResult<impl IntoResponse> {
    if let Some(map) = state.cache.get_seat_map(showing_id).await {
        return Ok(([("X-Cache", "HIT")], Json(map)));
    }

    let map = state.seats.seat_map(showing_id).await?;
    state.cache.save_seat_map(&map).await;
    Ok(([("X-Cache", "MISS")], Json(map)))
}

#[derive(Debug, Serialize)]
struct FreeSeatsResponse {
    showing_id: ShowingId,
    count: usize,
    seats: Vec<SeatPosition>,
}

// GET /api/showings/{id}/seats/free
async fn list_free_seats(
    State(state): State<Arc<AppState>>,
    Path(showing_id): Path<ShowingId>,
) -> ApiResult<Json<FreeSeatsResponse>> {
    let seats: Vec<SeatPosition> = state.seats.list_free(showing_id).await?.into_iter().collect();
    Ok(Json(FreeSeatsResponse {
        showing_id,
        count: seats.len(),
        seats,
    }))
}
