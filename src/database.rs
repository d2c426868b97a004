use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::store::PgStore;

/// Пул соединений Postgres и миграции схемы бронирования.
#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn connect(config: &StorageConfig) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is not set")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .context("failed to connect to Postgres")?;

        info!("Database connected (pool size {})", config.pool_size);
        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Транзакционное хранилище поверх пула соединений.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }
}
