use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{BookingId, Money, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(PaymentStatus::Completed),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

/// Проведённый платёж. Не изменяется и не удаляется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub transaction_ref: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn completed(booking_id: BookingId, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            status: PaymentStatus::Completed,
            transaction_ref: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}
