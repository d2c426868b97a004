pub mod error;
pub mod seats;
pub mod bookings;
pub mod payment;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(seats::routes())
        .merge(bookings::routes())
        .merge(payment::routes())
}

/// Полный роутер приложения: служебные маршруты и `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
