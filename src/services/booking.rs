//! Жизненный цикл брони.
//!
//! ```text
//! Pending ──confirm──> Confirmed
//!    │  └───cancel───> Cancelled
//!    └─────expire────> Expired
//! ```
//!
//! Каждая операция выполняется в одной транзакции хранилища: статус брони и
//! статусы её мест меняются вместе или не меняются вовсе. Только этот сервис
//! пишет статусы мест.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::BookingError;
use crate::models::{
    Booking, BookingDetails, BookingId, BookingStatus, CreateBooking, Money, SeatPosition,
};
use crate::store::{SharedStore, StoreTx};

#[derive(Clone)]
pub struct BookingService {
    store: SharedStore,
}

impl BookingService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Создаёт бронь в статусе Pending и резервирует места.
    ///
    /// Повторяющиеся позиции схлопываются, порядок позиций на результат не
    /// влияет. Если хотя бы одно место занято, не сохраняется ничего.
    pub async fn create(&self, request: CreateBooking) -> Result<Booking, BookingError> {
        let mut tx = self.store.begin().await?;

        let showing = tx
            .showing(request.showing_id)
            .await?
            .ok_or(BookingError::ShowingNotFound(request.showing_id))?;

        if request.seats.is_empty() {
            return Err(BookingError::InvalidRequest(
                "at least one seat must be requested".to_string(),
            ));
        }
        let requester = request.requester.trim();
        if requester.is_empty() {
            return Err(BookingError::InvalidRequest(
                "requester name must not be empty".to_string(),
            ));
        }
        let positions: Vec<SeatPosition> =
            SeatPosition::distinct(&request.seats).into_iter().collect();
        let contact = request
            .contact
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if let Some(outside) = positions.iter().find(|p| !p.within(showing.rows, showing.cols)) {
            return Err(BookingError::InvalidRequest(format!(
                "seat {} is outside the {}x{} grid",
                outside, showing.rows, showing.cols
            )));
        }

        let total = total_price(showing.price_per_seat, positions.len())?;
        let booking = Booking::pending(showing.id, requester.to_string(), contact, total);

        tx.insert_booking(&booking).await?;
        if let Err(e) = tx.reserve_seats(showing.id, &positions, booking.id).await {
            // tx откатится при drop вместе со вставленной бронью
            debug!("Reservation for showing {} rejected: {}", showing.id, e);
            return Err(e.into());
        }
        tx.commit().await?;

        info!(
            "Booking {} created for '{}': {} seats on showing {}, total {}",
            booking.id,
            booking.requester_name,
            positions.len(),
            showing.id,
            booking.total_price
        );
        Ok(booking)
    }

    /// Pending -> Confirmed, места продаются.
    pub async fn confirm(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut tx = self.store.begin().await?;
        let mut booking = lock_existing(tx.as_mut(), id).await?;

        if booking.status.is_terminal() {
            return Err(BookingError::InvalidState {
                id,
                status: booking.status,
                action: "confirm",
            });
        }

        let now = Utc::now();
        tx.update_booking_status(id, BookingStatus::Confirmed, Some(now))
            .await?;
        let sold = tx.sell_seats(id).await?;
        tx.commit().await?;

        booking.status = BookingStatus::Confirmed;
        booking.confirmed_at = Some(now);
        info!("Booking {} confirmed, {} seats sold", id, sold);
        Ok(booking)
    }

    /// Отмена из любого статуса, кроме уже отменённого. Места освобождаются.
    pub async fn cancel(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut tx = self.store.begin().await?;
        let mut booking = lock_existing(tx.as_mut(), id).await?;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState {
                id,
                status: booking.status,
                action: "cancel",
            });
        }
        if booking.status == BookingStatus::Confirmed {
            warn!("Cancelling confirmed booking {}: sold seats go back on sale", id);
        }

        let released = release(tx.as_mut(), id, BookingStatus::Cancelled).await?;
        tx.commit().await?;

        booking.status = BookingStatus::Cancelled;
        info!("Booking {} cancelled, {} seats released", id, released);
        Ok(booking)
    }

    /// Помечает бронь истёкшей без проверки статуса и освобождает места.
    /// Когда это уместно, решает `ExpirySweeper`.
    pub async fn expire(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut tx = self.store.begin().await?;
        let mut booking = lock_existing(tx.as_mut(), id).await?;

        let released = release(tx.as_mut(), id, BookingStatus::Expired).await?;
        tx.commit().await?;

        booking.status = BookingStatus::Expired;
        info!("Booking {} expired, {} seats released", id, released);
        Ok(booking)
    }

    /// Истекает бронь, только если она всё ещё Pending и создана до `cutoff`.
    /// Проверка и переход идут в одной транзакции, поэтому бронь,
    /// подтверждённая параллельно, не будет истечена.
    pub async fn expire_stale(
        &self,
        id: BookingId,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingError> {
        let mut tx = self.store.begin().await?;
        let mut booking = lock_existing(tx.as_mut(), id).await?;

        if booking.status.is_terminal() || booking.created_at >= cutoff {
            debug!("Booking {} is no longer stale ({})", id, booking.status);
            return Ok(None);
        }

        let released = release(tx.as_mut(), id, BookingStatus::Expired).await?;
        tx.commit().await?;

        booking.status = BookingStatus::Expired;
        info!("Stale booking {} expired, {} seats released", id, released);
        Ok(Some(booking))
    }

    pub async fn find_by_requester(&self, name: &str) -> Result<Vec<Booking>, BookingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.bookings_by_requester(name).await?)
    }

    /// Бронь вместе с принадлежащими ей местами.
    pub async fn get(&self, id: BookingId) -> Result<BookingDetails, BookingError> {
        let mut tx = self.store.begin().await?;
        let booking = tx
            .booking(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))?;
        let seats = tx.seats_of(id).await?;
        Ok(BookingDetails::new(booking, seats))
    }

    /// Id броней, которые держат места дольше `cutoff`.
    pub async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<BookingId>, BookingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.stale_pending(cutoff).await?)
    }
}

async fn lock_existing(tx: &mut dyn StoreTx, id: BookingId) -> Result<Booking, BookingError> {
    tx.lock_booking(id)
        .await?
        .ok_or(BookingError::BookingNotFound(id))
}

async fn release(
    tx: &mut dyn StoreTx,
    id: BookingId,
    status: BookingStatus,
) -> Result<u64, BookingError> {
    tx.update_booking_status(id, status, None).await?;
    Ok(tx.release_seats(id).await?)
}

fn total_price(price_per_seat: Money, seats: usize) -> Result<Money, BookingError> {
    i64::try_from(seats)
        .ok()
        .and_then(|count| price_per_seat.checked_mul(count))
        .ok_or_else(|| BookingError::InvalidRequest("total price overflows".to_string()))
}
