use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::{BookingId, ShowingId};

/// Позиция места в зале: ряд и номер, нумерация с 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatPosition {
    pub row: i32,
    pub col: i32,
}

impl SeatPosition {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Лежит ли позиция внутри сетки rows × cols.
    pub fn within(&self, rows: i32, cols: i32) -> bool {
        (1..=rows).contains(&self.row) && (1..=cols).contains(&self.col)
    }

    /// Убирает дубликаты и упорядочивает позиции по (ряд, место).
    pub fn distinct(positions: &[SeatPosition]) -> BTreeSet<SeatPosition> {
        positions.iter().copied().collect()
    }
}

impl fmt::Display for SeatPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i32, i32)> for SeatPosition {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Free,
    Reserved,
    Sold,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Free => "free",
            SeatStatus::Reserved => "reserved",
            SeatStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SeatStatus::Free),
            "reserved" => Ok(SeatStatus::Reserved),
            "sold" => Ok(SeatStatus::Sold),
            other => Err(format!("unknown seat status '{}'", other)),
        }
    }
}

/// Место конкретного сеанса. `booking_id` заполнен тогда и только тогда,
/// когда место не свободно.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub showing_id: ShowingId,
    pub position: SeatPosition,
    pub status: SeatStatus,
    pub booking_id: Option<BookingId>,
}

impl Seat {
    pub fn free(showing_id: ShowingId, position: SeatPosition) -> Self {
        Self {
            showing_id,
            position,
            status: SeatStatus::Free,
            booking_id: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.status == SeatStatus::Free
    }
}

/// Одна клетка схемы зала для отображения.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCell {
    pub row: i32,
    pub col: i32,
    pub status: SeatStatus,
}

/// Схема зала (GetSeatMap): только позиции и статусы, без владельцев.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    pub showing_id: ShowingId,
    pub rows: i32,
    pub cols: i32,
    pub seats: Vec<SeatCell>,
}

impl SeatMap {
    pub fn status_at(&self, position: SeatPosition) -> Option<SeatStatus> {
        self.seats
            .iter()
            .find(|cell| cell.row == position.row && cell.col == position.col)
            .map(|cell| cell.status)
    }

    pub fn count(&self, status: SeatStatus) -> usize {
        self.seats.iter().filter(|cell| cell.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_collapses_duplicates_and_sorts() {
        let positions = vec![
            SeatPosition::new(2, 1),
            SeatPosition::new(1, 3),
            SeatPosition::new(2, 1),
            SeatPosition::new(1, 1),
        ];
        let distinct: Vec<_> = SeatPosition::distinct(&positions).into_iter().collect();
        assert_eq!(
            distinct,
            vec![SeatPosition::new(1, 1), SeatPosition::new(1, 3), SeatPosition::new(2, 1)]
        );
    }

    #[test]
    fn within_uses_one_based_grid() {
        assert!(SeatPosition::new(1, 1).within(2, 2));
        assert!(SeatPosition::new(2, 2).within(2, 2));
        assert!(!SeatPosition::new(0, 1).within(2, 2));
        assert!(!SeatPosition::new(3, 1).within(2, 2));
        assert!(!SeatPosition::new(1, -1).within(2, 2));
    }

    #[test]
    fn seat_status_round_trips_through_text() {
        for status in [SeatStatus::Free, SeatStatus::Reserved, SeatStatus::Sold] {
            assert_eq!(status.as_str().parse::<SeatStatus>(), Ok(status));
        }
        assert!("booked".parse::<SeatStatus>().is_err());
    }
}
