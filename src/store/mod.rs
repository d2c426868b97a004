//! Транзакционный доступ к хранилищу.
//!
//! Каждая операция жизненного цикла брони открывает ровно одну транзакцию
//! через [`Store::begin`], выполняет все чтения и записи внутри неё и
//! вызывает [`StoreTx::commit`]. Транзакция, удалённая без commit,
//! откатывается. Хранилище передаётся сервисам явно как [`SharedStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{
    Booking, BookingId, BookingStatus, NewShowing, Payment, Seat, SeatPosition, Showing,
    ShowingId,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// Одна атомарная единица работы.
#[async_trait]
pub trait StoreTx: Send {
    // --- сеансы (только чтение, кроме регистрации сетки) ---

    async fn showing(&mut self, id: ShowingId) -> Result<Option<Showing>, StoreError>;

    /// Создаёт сеанс и все его места rows × cols в статусе Free.
    async fn insert_showing(&mut self, showing: &NewShowing) -> Result<Showing, StoreError>;

    // --- места ---

    /// Все места сеанса, упорядоченные по (ряд, место).
    async fn seats(&mut self, showing_id: ShowingId) -> Result<Vec<Seat>, StoreError>;

    async fn seat(
        &mut self,
        showing_id: ShowingId,
        position: SeatPosition,
    ) -> Result<Option<Seat>, StoreError>;

    /// Проверка под теми же блокировками, что и `reserve_seats`.
    /// `positions` должны быть уникальны и упорядочены.
    async fn check_all_free(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Result<bool, StoreError>;

    /// Free -> Reserved для всех позиций или ни для одной.
    /// При конфликте возвращает `SeatUnavailable` с первой занятой позицией.
    async fn reserve_seats(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
        booking_id: BookingId,
    ) -> Result<(), StoreError>;

    /// Reserved -> Sold для мест брони. Возвращает число изменённых мест.
    async fn sell_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError>;

    /// Освобождает все места брони независимо от их статуса.
    async fn release_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError>;

    async fn seats_of(&mut self, booking_id: BookingId) -> Result<Vec<SeatPosition>, StoreError>;

    // --- брони ---

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError>;

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Читает бронь и блокирует её до конца транзакции.
    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    async fn update_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn bookings_by_requester(&mut self, name: &str) -> Result<Vec<Booking>, StoreError>;

    /// Id броней в статусе Pending, созданных раньше `cutoff`.
    async fn stale_pending(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<BookingId>, StoreError>;

    // --- платежи ---

    async fn payment_for_booking(
        &mut self,
        booking_id: BookingId,
    ) -> Result<Option<Payment>, StoreError>;

    /// Второй платёж по той же брони отклоняется как `DuplicatePayment`.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
