use serde::Deserialize;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub redis: Option<RedisConfig>,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

// Настройки хранилища
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub pool_size: u32,
}

// Настройки Redis (кеш схем залов)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub seat_map_ttl_seconds: u64,
}

// Политика удержания мест
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Сколько живёт неоплаченная бронь до истечения.
    pub hold_seconds: i64,
    /// Как часто запускается очистка истёкших броней.
    pub sweep_interval_seconds: u64,
}

/// Плоский вид переменных окружения, как их отдаёт `config::Environment`.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    host: String,
    port: u16,
    environment: String,
    rust_log: String,
    storage_backend: StorageBackend,
    database_url: Option<String>,
    db_pool_size: u32,
    redis_url: Option<String>,
    seat_map_ttl_seconds: u64,
    booking_hold_seconds: i64,
    sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let source = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("environment", "development")?
            .set_default("rust_log", "cinema_booking=debug,tower_http=debug")?
            .set_default("storage_backend", "postgres")?
            .set_default("db_pool_size", 20)?
            .set_default("seat_map_ttl_seconds", 30)?
            .set_default("booking_hold_seconds", 900)?
            .set_default("sweep_interval_seconds", 300)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Self::from_settings(source.try_deserialize()?)
    }

    fn from_settings(env: EnvSettings) -> Result<Self, config::ConfigError> {
        if env.storage_backend == StorageBackend::Postgres && env.database_url.is_none() {
            return Err(config::ConfigError::Message(
                "DATABASE_URL must be set when STORAGE_BACKEND=postgres".to_string(),
            ));
        }
        if env.booking_hold_seconds <= 0 {
            return Err(config::ConfigError::Message(
                "BOOKING_HOLD_SECONDS must be positive".to_string(),
            ));
        }
        if env.sweep_interval_seconds == 0 {
            return Err(config::ConfigError::Message(
                "SWEEP_INTERVAL_SECONDS must be positive".to_string(),
            ));
        }

        Ok(Config {
            app: AppConfig {
                host: env.host,
                port: env.port,
                environment: env.environment,
                rust_log: env.rust_log,
            },
            storage: StorageConfig {
                backend: env.storage_backend,
                database_url: env.database_url,
                pool_size: env.db_pool_size,
            },
            redis: env.redis_url.map(|url| RedisConfig {
                url,
                seat_map_ttl_seconds: env.seat_map_ttl_seconds,
            }),
            booking: BookingConfig {
                hold_seconds: env.booking_hold_seconds,
                sweep_interval_seconds: env.sweep_interval_seconds,
            },
        })
    }

    /// Конфигурация для запуска в памяти, без внешних сервисов.
    pub fn in_memory() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                rust_log: "cinema_booking=debug".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: None,
                pool_size: 1,
            },
            redis: None,
            booking: BookingConfig {
                hold_seconds: 900,
                sweep_interval_seconds: 300,
            },
        }
    }
}
