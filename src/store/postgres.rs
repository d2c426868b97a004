//! Хранилище на PostgreSQL.
//!
//! Одна транзакция sqlx на единицу работы. Перед любой проверкой целевые
//! строки мест блокируются `SELECT ... FOR UPDATE` в порядке (ряд, место),
//! поэтому две конкурирующие брони на пересекающиеся места выполняются
//! последовательно и не взаимоблокируются. Сама резервация дополнительно
//! условна: `UPDATE ... WHERE status = 'free'`.
//!
//! Сопоставление строк таблиц с моделями живёт только здесь.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::error::StoreError;
use crate::models::{
    Booking, BookingId, BookingStatus, NewShowing, Payment, Seat, SeatPosition, Showing,
    ShowingId,
};

const PAYMENT_BOOKING_UNIQUE: &str = "payments_booking_id_key";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

// --- строки таблиц ---

#[derive(FromRow)]
struct ShowingRow {
    id: i64,
    movie_id: i64,
    grid_rows: i32,
    grid_cols: i32,
    price_per_seat: i64,
    starts_at: DateTime<Utc>,
}

impl From<ShowingRow> for Showing {
    fn from(row: ShowingRow) -> Self {
        Showing {
            id: row.id,
            movie_id: row.movie_id,
            rows: row.grid_rows,
            cols: row.grid_cols,
            price_per_seat: row.price_per_seat,
            starts_at: row.starts_at,
        }
    }
}

#[derive(FromRow)]
struct SeatRow {
    showing_id: i64,
    seat_row: i32,
    seat_col: i32,
    status: String,
    booking_id: Option<Uuid>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            showing_id: row.showing_id,
            position: SeatPosition::new(row.seat_row, row.seat_col),
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            booking_id: row.booking_id,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    showing_id: i64,
    requester_name: String,
    requester_contact: Option<String>,
    status: String,
    total_price: i64,
    created_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            showing_id: row.showing_id,
            requester_name: row.requester_name,
            requester_contact: row.requester_contact,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            total_price: row.total_price,
            created_at: row.created_at,
            confirmed_at: row.confirmed_at,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: i64,
    status: String,
    transaction_ref: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            transaction_ref: row.transaction_ref,
            created_at: row.created_at,
        })
    }
}

fn split_positions(positions: &[SeatPosition]) -> (Vec<i32>, Vec<i32>) {
    positions.iter().map(|p| (p.row, p.col)).unzip()
}

fn first_conflict(positions: &[SeatPosition], locked: &[Seat]) -> Option<SeatPosition> {
    positions.iter().copied().find(|position| {
        !locked
            .iter()
            .any(|seat| seat.position == *position && seat.is_free())
    })
}

/// Все целевые строки заблокированы и свободны, значит условный UPDATE
/// обязан затронуть каждую. Иначе нарушен инвариант хранилища.
fn ensure_all_reserved(showing_id: ShowingId, updated: u64, expected: usize) -> Result<(), StoreError> {
    if updated == expected as u64 {
        return Ok(());
    }
    Err(StoreError::Corrupt(format!(
        "conditional reserve touched {} of {} locked free seats for showing {}",
        updated, expected, showing_id
    )))
}

fn is_duplicate_payment(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(PAYMENT_BOOKING_UNIQUE)
        }
        _ => false,
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    /// Блокирует строки мест по списку позиций в порядке (ряд, место).
    async fn lock_targets(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Result<Vec<Seat>, StoreError> {
        let (rows, cols) = split_positions(positions);
        let locked: Vec<SeatRow> = sqlx::query_as(
            r#"
            SELECT showing_id, seat_row, seat_col, status, booking_id
            FROM seats
            WHERE showing_id = $1
              AND (seat_row, seat_col) IN (SELECT * FROM UNNEST($2::int4[], $3::int4[]))
            ORDER BY seat_row, seat_col
            FOR UPDATE
            "#,
        )
        .bind(showing_id)
        .bind(rows)
        .bind(cols)
        .fetch_all(&mut *self.tx)
        .await?;

        locked.into_iter().map(Seat::try_from).collect()
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn showing(&mut self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        let row: Option<ShowingRow> = sqlx::query_as(
            "SELECT id, movie_id, grid_rows, grid_cols, price_per_seat, starts_at
             FROM showings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Showing::from))
    }

    async fn insert_showing(&mut self, showing: &NewShowing) -> Result<Showing, StoreError> {
        let row: ShowingRow = sqlx::query_as(
            r#"
            INSERT INTO showings (movie_id, grid_rows, grid_cols, price_per_seat, starts_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, movie_id, grid_rows, grid_cols, price_per_seat, starts_at
            "#,
        )
        .bind(showing.movie_id)
        .bind(showing.rows)
        .bind(showing.cols)
        .bind(showing.price_per_seat)
        .bind(showing.starts_at)
        .fetch_one(&mut *self.tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO seats (showing_id, seat_row, seat_col, status)
            SELECT $1, r, c, 'free'
            FROM generate_series(1, $2::int4) AS r, generate_series(1, $3::int4) AS c
            "#,
        )
        .bind(row.id)
        .bind(row.grid_rows)
        .bind(row.grid_cols)
        .execute(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn seats(&mut self, showing_id: ShowingId) -> Result<Vec<Seat>, StoreError> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT showing_id, seat_row, seat_col, status, booking_id
             FROM seats WHERE showing_id = $1
             ORDER BY seat_row, seat_col",
        )
        .bind(showing_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Seat::try_from).collect()
    }

    async fn seat(
        &mut self,
        showing_id: ShowingId,
        position: SeatPosition,
    ) -> Result<Option<Seat>, StoreError> {
        let row: Option<SeatRow> = sqlx::query_as(
            "SELECT showing_id, seat_row, seat_col, status, booking_id
             FROM seats WHERE showing_id = $1 AND seat_row = $2 AND seat_col = $3",
        )
        .bind(showing_id)
        .bind(position.row)
        .bind(position.col)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Seat::try_from).transpose()
    }

    async fn check_all_free(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
    ) -> Result<bool, StoreError> {
        let locked = self.lock_targets(showing_id, positions).await?;
        Ok(first_conflict(positions, &locked).is_none())
    }

    async fn reserve_seats(
        &mut self,
        showing_id: ShowingId,
        positions: &[SeatPosition],
        booking_id: BookingId,
    ) -> Result<(), StoreError> {
        let locked = self.lock_targets(showing_id, positions).await?;
        if let Some(conflict) = first_conflict(positions, &locked) {
            return Err(StoreError::SeatUnavailable(conflict));
        }

        let (rows, cols) = split_positions(positions);
        let updated = sqlx::query(
            r#"
            UPDATE seats
            SET status = 'reserved', booking_id = $4
            WHERE showing_id = $1
              AND status = 'free'
              AND (seat_row, seat_col) IN (SELECT * FROM UNNEST($2::int4[], $3::int4[]))
            "#,
        )
        .bind(showing_id)
        .bind(rows)
        .bind(cols)
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        ensure_all_reserved(showing_id, updated, positions.len())
    }

    async fn sell_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE seats SET status = 'sold' WHERE booking_id = $1 AND status = 'reserved'",
        )
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn release_seats(&mut self, booking_id: BookingId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE seats SET status = 'free', booking_id = NULL WHERE booking_id = $1",
        )
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn seats_of(&mut self, booking_id: BookingId) -> Result<Vec<SeatPosition>, StoreError> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT seat_row, seat_col FROM seats WHERE booking_id = $1 ORDER BY seat_row, seat_col",
        )
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(SeatPosition::from).collect())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, showing_id, requester_name, requester_contact,
                                  status, total_price, created_at, confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.showing_id)
        .bind(&booking.requester_name)
        .bind(&booking.requester_contact)
        .bind(booking.status.as_str())
        .bind(booking.total_price)
        .bind(booking.created_at)
        .bind(booking.confirmed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, showing_id, requester_name, requester_contact, status,
                    total_price, created_at, confirmed_at
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, showing_id, requester_name, requester_contact, status,
                    total_price, created_at, confirmed_at
             FROM bookings WHERE id = $1
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn update_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bookings SET status = $2, confirmed_at = COALESCE($3, confirmed_at) WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(confirmed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn bookings_by_requester(&mut self, name: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            "SELECT id, showing_id, requester_name, requester_contact, status,
                    total_price, created_at, confirmed_at
             FROM bookings WHERE requester_name = $1
             ORDER BY created_at, id",
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn stale_pending(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<BookingId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM bookings
             WHERE status = 'pending' AND created_at < $1
             ORDER BY created_at, id",
        )
        .bind(cutoff)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn payment_for_booking(
        &mut self,
        booking_id: BookingId,
    ) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, booking_id, amount, status, transaction_ref, created_at
             FROM payments WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount, status, transaction_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.transaction_ref)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_payment(&e) => Err(StoreError::DuplicatePayment(payment.booking_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
