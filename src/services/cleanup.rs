use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tracing::{error, info};

use crate::cache::CacheService;
use crate::error::BookingError;
use crate::services::BookingService;

/// Переводит зависшие Pending брони в Expired и освобождает их места.
#[derive(Clone)]
pub struct ExpirySweeper {
    bookings: BookingService,
    cache: CacheService,
    hold: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub failed: usize,
}

impl SweepReport {
    /// Брони, которые стали не-Pending между выборкой и переходом.
    pub fn skipped(&self) -> usize {
        self.scanned - self.expired - self.failed
    }
}

impl ExpirySweeper {
    pub fn new(bookings: BookingService, hold: Duration) -> Self {
        Self {
            bookings,
            cache: CacheService::disabled(),
            hold,
        }
    }

    /// Сбрасывать кеш схемы зала после каждой истёкшей брони.
    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = cache;
        self
    }

    /// Один проход очистки относительно момента `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, BookingError> {
        let cutoff = now - self.hold;
        let stale = self.bookings.stale_pending(cutoff).await?;

        let mut report = SweepReport {
            scanned: stale.len(),
            ..SweepReport::default()
        };
        if stale.is_empty() {
            return Ok(report);
        }

        info!("🎫 Found {} stale bookings to expire", stale.len());

        for booking_id in stale {
            match self.bookings.expire_stale(booking_id, cutoff).await {
                Ok(Some(booking)) => {
                    self.cache.invalidate_seats(booking.showing_id).await;
                    report.expired += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("🎫 Failed to expire booking {}: {}", booking_id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Бесконечный цикл очистки; запускается в фоне из `main`.
    pub async fn run(self, interval: StdDuration) {
        info!(
            "🧹 Expiry sweeper started: hold {}s, every {}s",
            self.hold.num_seconds(),
            interval.as_secs()
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep(Utc::now()).await {
                Ok(report) if report.scanned > 0 => info!(
                    "✅ Sweep done: {} expired, {} skipped, {} failed",
                    report.expired,
                    report.skipped(),
                    report.failed
                ),
                Ok(_) => {}
                Err(e) => error!("Sweep failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_is_what_was_neither_expired_nor_failed() {
        let report = SweepReport {
            scanned: 5,
            expired: 3,
            failed: 1,
        };
        assert_eq!(report.skipped(), 1);
    }
}
