use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{BookingId, Money, SeatPosition, ShowingId};

/// Статусы брони. Из Pending есть ровно три перехода, остальные статусы конечные.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "expired" => Ok(BookingStatus::Expired),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub showing_id: ShowingId,
    pub requester_name: String,
    pub requester_contact: Option<String>,
    pub status: BookingStatus,
    /// Считается при создании и больше не меняется.
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn pending(
        showing_id: ShowingId,
        requester_name: String,
        requester_contact: Option<String>,
        total_price: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            showing_id,
            requester_name,
            requester_contact,
            status: BookingStatus::Pending,
            total_price,
            created_at: Utc::now(),
            confirmed_at: None,
        }
    }
}

/// Запрос на создание брони.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBooking {
    pub showing_id: ShowingId,
    pub requester: String,
    pub contact: Option<String>,
    pub seats: Vec<SeatPosition>,
}

/// Бронь вместе с местами, которые ей принадлежат.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub seats: Vec<SeatPosition>,
    pub seats_count: usize,
}

impl BookingDetails {
    pub fn new(booking: Booking, seats: Vec<SeatPosition>) -> Self {
        let seats_count = seats.len();
        Self {
            booking,
            seats,
            seats_count,
        }
    }
}
