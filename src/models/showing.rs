use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, ShowingId};

/// Сеанс фильма: размер сетки и единая цена места.
/// Принадлежит каталогу, ядро бронирования только читает его.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showing {
    pub id: ShowingId,
    pub movie_id: i64,
    pub rows: i32,
    pub cols: i32,
    pub price_per_seat: Money,
    pub starts_at: DateTime<Utc>,
}

/// Данные сеанса от каталога до присвоения id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShowing {
    pub movie_id: i64,
    pub rows: i32,
    pub cols: i32,
    pub price_per_seat: Money,
    pub starts_at: DateTime<Utc>,
}

impl NewShowing {
    pub fn new(movie_id: i64, rows: i32, cols: i32, price_per_seat: Money) -> Self {
        Self {
            movie_id,
            rows,
            cols,
            price_per_seat,
            starts_at: Utc::now(),
        }
    }

    pub fn into_showing(self, id: ShowingId) -> Showing {
        Showing {
            id,
            movie_id: self.movie_id,
            rows: self.rows,
            cols: self.cols,
            price_per_seat: self.price_per_seat,
            starts_at: self.starts_at,
        }
    }
}
