//! Хранилище в памяти.
//!
//! Всё состояние лежит под одним `tokio::sync::Mutex`. Транзакция владеет
//! блокировкой; рабочая копия состояния создаётся при первой записи.
//! Commit подменяет состояние копией, drop без commit просто выбрасывает её.
//! Транзакции выполняются строго по очереди, поэтому результат всегда
//! сериализуем.
//!
//! Данные живут только в процессе, а сеансы регистрируются лишь через
//! `SeatService::register_showing`. Бэкенд предназначен для тестов и
//! локальных прогонов.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::error::StoreError;
use crate::models::{
    Booking, BookingId, BookingStatus, NewShowing, Payment, PaymentId, Seat, SeatPosition,
    SeatStatus, Showing, ShowingId,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_showing_id: ShowingId,
    showings: HashMap<ShowingId, Showing>,
    seats: BTreeMap<(ShowingId, SeatPosition), Seat>,
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<PaymentId, Payment>,
}

impl MemoryState {
    fn showing_seats(&self, showing_id: ShowingId) -> impl Iterator<Item = &Seat> {
        let from = (showing_id, SeatPosition::new(i32::MIN, i32::MIN));
        let to = (showing_id, SeatPosition::new(i32::MAX, i32::MAX));
        self.seats.range(from..=to).map(|(_, seat)| seat)
    }

    fn first_conflict(
        &self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Option<SeatPosition> {
        positions.iter().copied().find(|position| {
            !self
                .seats
                .get(&(showing_id, *position))
                .is_some_and(Seat::is_free)
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            guard,
            working: None,
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: Option<MemoryState>,
}

impl MemoryTx {
    fn state(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn state_mut(&mut self) -> &mut MemoryState {
        let committed = &self.guard;
        self.working.get_or_insert_with(|| (**committed).clone())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn showing(&mut self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        Ok(self.state().showings.get(&id).cloned())
    }

    async fn insert_showing(&mut self, showing: &NewShowing) -> Result<Showing, StoreError> {
        let state = self.state_mut();
        state.last_showing_id += 1;
        let showing = showing.clone().into_showing(state.last_showing_id);

        for row in 1..=showing.rows {
            for col in 1..=showing.cols {
                let position = SeatPosition::new(row, col);
                state
                    .seats
                    .insert((showing.id, position), Seat::free(showing.id, position));
            }
        }
        state.showings.insert(showing.id, showing.clone());
        Ok(showing)
    }

    async fn seats(&mut self, showing_id: ShowingId) -> Result<Vec<Seat>, StoreError> {
        Ok(self.state().showing_seats(showing_id).cloned().collect())
    }

    async fn seat(
        &mut self,
        showing_id: ShowingId,
        position: SeatPosition,
    ) -> Result<Option<Seat>, StoreError> {
        Ok(self.state().seats.get(&(showing_id, position)).cloned())
    }

    async fn check_all_free(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Result<bool, StoreError> {
        Ok(self.state().first_conflict(showing_id, positions).is_none())
    }

    async fn reserve_seats(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
        booking_id: BookingId,
    ) -> Result<(), StoreError> {
        if let Some(conflict) = self.state().first_conflict(showing_id, positions) {
            return Err(StoreError::SeatUnavailable(conflict));
        }

        let state = self.state_mut();
        for position in positions {
            if let Some(seat) = state.seats.get_mut(&(showing_id, *position)) {
                seat.status = SeatStatus::Reserved;
                seat.booking_id = Some(booking_id);
            }
        }
        Ok(())
    }

    async fn sell_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError> {
        let mut sold = 0;
        for seat in self.state_mut().seats.values_mut() {
            if seat.booking_id == Some(booking_id) && seat.status == SeatStatus::Reserved {
                seat.status = SeatStatus::Sold;
                sold += 1;
            }
        }
        Ok(sold)
    }

    async fn release_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError> {
        let mut released = 0;
        for seat in self.state_mut().seats.values_mut() {
            if seat.booking_id == Some(booking_id) {
                seat.status = SeatStatus::Free;
                seat.booking_id = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn seats_of(&mut self, booking_id: BookingId) -> Result<Vec<SeatPosition>, StoreError> {
        Ok(self
            .state()
            .seats
            .values()
            .filter(|seat| seat.booking_id == Some(booking_id))
            .map(|seat| seat.position)
            .collect())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        if !self.state().showings.contains_key(&booking.showing_id) {
            return Err(StoreError::Corrupt(format!(
                "booking {} references missing showing {}",
                booking.id, booking.showing_id
            )));
        }
        self.state_mut().bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.state().bookings.get(&id).cloned())
    }

    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        // вся транзакция уже держит единственную блокировку
        self.booking(id).await
    }

    async fn update_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let booking = self
            .state_mut()
            .bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::Corrupt(format!("booking {} vanished mid-transaction", id)))?;
        booking.status = status;
        if confirmed_at.is_some() {
            booking.confirmed_at = confirmed_at;
        }
        Ok(())
    }

    async fn bookings_by_requester(&mut self, name: &str) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .state()
            .bookings
            .values()
            .filter(|booking| booking.requester_name == name)
            .cloned()
            .collect();
        found.sort_by_key(|booking| (booking.created_at, booking.id));
        Ok(found)
    }

    async fn stale_pending(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<BookingId>, StoreError> {
        let mut stale: Vec<&Booking> = self
            .state()
            .bookings
            .values()
            .filter(|booking| booking.status == BookingStatus::Pending && booking.created_at < cutoff)
            .collect();
        stale.sort_by_key(|booking| (booking.created_at, booking.id));
        Ok(stale.into_iter().map(|booking| booking.id).collect())
    }

    async fn payment_for_booking(
        &mut self,
        booking_id: BookingId,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .values()
            .find(|payment| payment.booking_id == booking_id)
            .cloned())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        let duplicate = self
            .state()
            .payments
            .values()
            .any(|existing| existing.booking_id == payment.booking_id);
        if duplicate {
            return Err(StoreError::DuplicatePayment(payment.booking_id));
        }
        self.state_mut().payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}
