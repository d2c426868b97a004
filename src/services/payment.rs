//! Платёжный шлюз ядра.
//!
//! Интеграции с внешним эквайрингом здесь нет: модуль только проверяет, что
//! сумма совпадает с ценой брони, и фиксирует проведённый платёж. Статусы
//! брони и мест он не трогает, подтверждение остаётся отдельным шагом.

use tracing::{info, warn};

use crate::error::PaymentError;
use crate::models::{BookingId, Money, Payment};
use crate::store::SharedStore;

#[derive(Clone)]
pub struct PaymentGate {
    store: SharedStore,
}

impl PaymentGate {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Проводит платёж по брони.
    ///
    /// Сумма сравнивается с ценой брони строго, без допусков. Второй платёж
    /// по той же брони отклоняется, в том числе при гонке двух вызовов:
    /// тогда его отбрасывает уникальный ключ хранилища.
    pub async fn process(&self, booking_id: BookingId, amount: Money) -> Result<Payment, PaymentError> {
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound(booking_id))?;

        if tx.payment_for_booking(booking_id).await?.is_some() {
            return Err(PaymentError::DuplicatePayment(booking_id));
        }
        if booking.status.is_terminal() {
            return Err(PaymentError::InvalidState {
                id: booking_id,
                status: booking.status,
            });
        }
        if amount != booking.total_price {
            warn!(
                "Payment for booking {} rejected: expected {}, got {}",
                booking_id, booking.total_price, amount
            );
            return Err(PaymentError::AmountMismatch {
                expected: booking.total_price,
                actual: amount,
            });
        }

        let payment = Payment::completed(booking_id, amount);
        tx.insert_payment(&payment).await?;
        tx.commit().await?;

        info!(
            "Payment {} completed for booking {}: amount {}, transaction {}",
            payment.id, booking_id, amount, payment.transaction_ref
        );
        Ok(payment)
    }

    pub async fn for_booking(&self, booking_id: BookingId) -> Result<Option<Payment>, PaymentError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.payment_for_booking(booking_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, CreateBooking, NewShowing, PaymentStatus, SeatPosition};
    use crate::services::{BookingService, SeatService};
    use crate::store::InMemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn pending_booking() -> (PaymentGate, BookingService, BookingId) {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let showing = SeatService::new(store.clone())
            .register_showing(NewShowing::new(1, 5, 8, 250))
            .await
            .unwrap();
        let bookings = BookingService::new(store.clone());
        let booking = bookings
            .create(CreateBooking {
                showing_id: showing.id,
                requester: "Ivan".to_string(),
                contact: None,
                seats: vec![SeatPosition::new(1, 1), SeatPosition::new(1, 2)],
            })
            .await
            .unwrap();
        (PaymentGate::new(store), bookings, booking.id)
    }

    #[tokio::test]
    async fn exact_amount_is_recorded_as_completed() {
        let (gate, _, booking_id) = pending_booking().await;
        let payment = gate.process(booking_id, 500).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount, 500);
        assert_eq!(gate.for_booking(booking_id).await.unwrap(), Some(payment));
    }

    #[tokio::test]
    async fn any_difference_in_amount_is_rejected() {
        let (gate, _, booking_id) = pending_booking().await;
        for amount in [499, 501, 0] {
            match gate.process(booking_id, amount).await {
                Err(PaymentError::AmountMismatch { expected, actual }) => {
                    assert_eq!(expected, 500);
                    assert_eq!(actual, amount);
                }
                other => panic!("expected AmountMismatch, got {:?}", other),
            }
        }
        assert!(gate.for_booking(booking_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn payment_does_not_change_booking() {
        let (gate, bookings, booking_id) = pending_booking().await;
        gate.process(booking_id, 500).await.unwrap();
        let details = bookings.get(booking_id).await.unwrap();
        assert_eq!(details.booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_booking_cannot_be_paid() {
        let (gate, _, _) = pending_booking().await;
        assert!(matches!(
            gate.process(Uuid::new_v4(), 500).await,
            Err(PaymentError::BookingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_paid() {
        let (gate, bookings, booking_id) = pending_booking().await;
        bookings.cancel(booking_id).await.unwrap();
        assert!(matches!(
            gate.process(booking_id, 500).await,
            Err(PaymentError::InvalidState { status: BookingStatus::Cancelled, .. })
        ));
    }
}
