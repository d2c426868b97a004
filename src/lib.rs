pub mod config;
pub mod database;
pub mod cache;
pub mod error;
pub mod models;
pub mod store;
pub mod services;
pub mod controllers;

use anyhow::Context;
use std::sync::Arc;
use tracing::warn;

use crate::cache::CacheService;
use crate::config::{Config, StorageBackend};
use crate::services::{BookingService, ExpirySweeper, PaymentGate, SeatService};
use crate::store::{InMemoryStore, SharedStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub seats: SeatService,
    pub bookings: BookingService,
    pub payments: PaymentGate,
    pub cache: CacheService,
    pub config: Config,
}

impl AppState {
    /// Поднимает хранилище и кеш по конфигурации.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: SharedStore = match config.storage.backend {
            StorageBackend::Postgres => {
                let db = database::Database::connect(&config.storage).await?;
                db.run_migrations()
                    .await
                    .context("failed to run migrations")?;
                Arc::new(db.store())
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage: test-only, data is lost on restart and showings cannot be registered over HTTP");
                Arc::new(InMemoryStore::new())
            }
        };

        // Без Redis сервис работает, просто без кеша схем залов
        let cache = match &config.redis {
            Some(redis) => CacheService::connect(redis)
                .await
                .context("failed to connect to Redis")?,
            None => CacheService::disabled(),
        };

        Ok(Self::with_store(store, cache, config))
    }

    pub fn with_store(store: SharedStore, cache: CacheService, config: Config) -> Arc<Self> {
        Arc::new(Self {
            seats: SeatService::new(store.clone()),
            bookings: BookingService::new(store.clone()),
            payments: PaymentGate::new(store),
            cache,
            config,
        })
    }

    /// Фоновая очистка броней с параметрами удержания из конфигурации.
    pub fn expiry_sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(
            self.bookings.clone(),
            chrono::Duration::seconds(self.config.booking.hold_seconds),
        )
        .with_cache(self.cache.clone())
    }
}
