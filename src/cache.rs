//! Кеш схем залов в Redis.
//!
//! Кеш только ускоряет чтение GetSeatMap. Источник истины о статусах мест
//! всегда хранилище, поэтому любая ошибка Redis логируется и проглатывается,
//! а после каждого перехода брони запись сеанса удаляется.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, info, warn};

use crate::config::RedisConfig;
use crate::models::{SeatMap, ShowingId};

#[derive(Clone)]
pub struct CacheService {
    conn: Option<MultiplexedConnection>,
    ttl_seconds: u64,
}

fn seat_map_key(showing_id: ShowingId) -> String {
    format!("seats:{}", showing_id)
}

impl CacheService {
    pub async fn connect(config: &RedisConfig) -> redis::RedisResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Seat map cache enabled (ttl {}s)", config.seat_map_ttl_seconds);
        Ok(Self {
            conn: Some(conn),
            ttl_seconds: config.seat_map_ttl_seconds,
        })
    }

    /// Кеш без Redis: все чтения промахиваются, записи ничего не делают.
    pub fn disabled() -> Self {
        Self {
            conn: None,
            ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn get_seat_map(&self, showing_id: ShowingId) -> Option<SeatMap> {
        let mut conn = self.conn.clone()?;
        let data: Option<String> = match conn.get(seat_map_key(showing_id)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Seat map cache read failed for showing {}: {}", showing_id, e);
                return None;
            }
        };

        match serde_json::from_str(&data?) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("Dropping unreadable seat map cache for showing {}: {}", showing_id, e);
                self.invalidate_seats(showing_id).await;
                None
            }
        }
    }

    pub async fn save_seat_map(&self, map: &SeatMap) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let data = match serde_json::to_string(map) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize seat map for showing {}: {}", map.showing_id, e);
                return;
            }
        };

        let result: redis::RedisResult<()> = conn
            .set_ex(seat_map_key(map.showing_id), data, self.ttl_seconds)
            .await;
        if let Err(e) = result {
            warn!("Seat map cache write failed for showing {}: {}", map.showing_id, e);
        }
    }

    // Инвалидировать кеш мест
    pub async fn invalidate_seats(&self, showing_id: ShowingId) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let result: redis::RedisResult<()> = conn.del(seat_map_key(showing_id)).await;
        match result {
            Ok(()) => debug!("Invalidated seats cache for showing {}", showing_id),
            Err(e) => warn!("Failed to invalidate seats cache for showing {}: {}", showing_id, e),
        }
    }
}
