#![allow(dead_code)]

use std::sync::Arc;

use cinema_booking::models::{Booking, CreateBooking, Money, NewShowing, SeatPosition, ShowingId};
use cinema_booking::services::{BookingService, PaymentGate, SeatService};
use cinema_booking::store::{InMemoryStore, SharedStore};

/// Сервисы поверх одного хранилища в памяти.
pub struct TestApp {
    pub store: SharedStore,
    pub seats: SeatService,
    pub bookings: BookingService,
    pub payments: PaymentGate,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(store: SharedStore) -> Self {
        Self {
            seats: SeatService::new(store.clone()),
            bookings: BookingService::new(store.clone()),
            payments: PaymentGate::new(store.clone()),
            store,
        }
    }

    pub async fn showing(&self, rows: i32, cols: i32, price: Money) -> ShowingId {
        self.seats
            .register_showing(NewShowing::new(1, rows, cols, price))
            .await
            .expect("register showing")
            .id
    }

    pub async fn book(&self, showing_id: ShowingId, requester: &str, seats: &[(i32, i32)]) -> Booking {
        self.bookings
            .create(request(showing_id, requester, seats))
            .await
            .expect("create booking")
    }
}

pub fn request(showing_id: ShowingId, requester: &str, seats: &[(i32, i32)]) -> CreateBooking {
    CreateBooking {
        showing_id,
        requester: requester.to_string(),
        contact: None,
        seats: positions(seats),
    }
}

pub fn positions(seats: &[(i32, i32)]) -> Vec<SeatPosition> {
    seats.iter().copied().map(SeatPosition::from).collect()
}
