use std::collections::BTreeSet;
use tracing::info;

use crate::error::BookingError;
use crate::models::{NewShowing, Seat, SeatCell, SeatMap, SeatPosition, Showing, ShowingId};
use crate::store::SharedStore;

/// Чтение сетки мест и регистрация сеансов от каталога.
/// Статусы мест здесь не меняются: это делает только жизненный цикл брони.
#[derive(Clone)]
pub struct SeatService {
    store: SharedStore,
}

impl SeatService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Регистрирует сеанс и создаёт все rows × cols мест свободными.
    pub async fn register_showing(&self, showing: NewShowing) -> Result<Showing, BookingError> {
        if showing.rows <= 0 || showing.cols <= 0 {
            return Err(BookingError::InvalidRequest(format!(
                "seat grid must be at least 1x1, got {}x{}",
                showing.rows, showing.cols
            )));
        }
        if showing.price_per_seat < 0 {
            return Err(BookingError::InvalidRequest(
                "price per seat must not be negative".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let showing = tx.insert_showing(&showing).await?;
        tx.commit().await?;

        info!(
            "Registered showing {} with {}x{} seats at {} per seat",
            showing.id, showing.rows, showing.cols, showing.price_per_seat
        );
        Ok(showing)
    }

    /// Схема зала: позиция и статус каждого места.
    pub async fn seat_map(&self, showing_id: ShowingId) -> Result<SeatMap, BookingError> {
        let mut tx = self.store.begin().await?;
        let showing = tx
            .showing(showing_id)
            .await?
            .ok_or(BookingError::ShowingNotFound(showing_id))?;
        let seats = tx.seats(showing_id).await?;

        Ok(SeatMap {
            showing_id,
            rows: showing.rows,
            cols: showing.cols,
            seats: seats
                .into_iter()
                .map(|seat| SeatCell {
                    row: seat.position.row,
                    col: seat.position.col,
                    status: seat.status,
                })
                .collect(),
        })
    }

    pub async fn list_free(
        &self,
        showing_id: ShowingId,
    ) -> Result<BTreeSet<SeatPosition>, BookingError> {
        let mut tx = self.store.begin().await?;
        if tx.showing(showing_id).await?.is_none() {
            return Err(BookingError::ShowingNotFound(showing_id));
        }

        Ok(tx
            .seats(showing_id)
            .await?
            .into_iter()
            .filter(Seat::is_free)
            .map(|seat| seat.position)
            .collect())
    }

    /// Проверка без резервации. Результат верен только на момент вызова;
    /// для самой брони проверку повторяет `BookingService::create`.
    pub async fn check_all_free(
        &self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Result<bool, BookingError> {
        let positions: Vec<SeatPosition> = SeatPosition::distinct(positions).into_iter().collect();
        let mut tx = self.store.begin().await?;
        Ok(tx.check_all_free(showing_id, &positions).await?)
    }

    pub async fn seat(
        &self,
        showing_id: ShowingId,
        position: SeatPosition,
    ) -> Result<Option<Seat>, BookingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.seat(showing_id, position).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeatStatus;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn service() -> SeatService {
        SeatService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn seat_map_covers_whole_grid() {
        let seats = service();
        let showing = seats.register_showing(NewShowing::new(1, 5, 8, 250)).await.unwrap();

        let map = seats.seat_map(showing.id).await.unwrap();
        assert_eq!((map.rows, map.cols), (5, 8));
        assert_eq!(map.seats.len(), 40);
        assert_eq!(map.count(SeatStatus::Free), 40);
        assert_eq!(seats.list_free(showing.id).await.unwrap().len(), 40);
    }

    #[tokio::test]
    async fn empty_grid_is_rejected() {
        let err = service()
            .register_showing(NewShowing::new(1, 0, 3, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unknown_showing_has_no_seat_map() {
        let err = service().seat_map(99).await.unwrap_err();
        assert!(matches!(err, BookingError::ShowingNotFound(99)));
    }

    #[tokio::test]
    async fn positions_outside_grid_are_not_free() {
        let seats = service();
        let showing = seats.register_showing(NewShowing::new(1, 2, 2, 100)).await.unwrap();

        assert!(seats
            .check_all_free(showing.id, &[SeatPosition::new(1, 1), SeatPosition::new(2, 2)])
            .await
            .unwrap());
        assert!(!seats
            .check_all_free(showing.id, &[SeatPosition::new(3, 1)])
            .await
            .unwrap());
    }
}
