use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{config::Config, controllers, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Cinema Booking API ({}, {:?} storage)",
        config.app.environment, config.storage.backend
    );

    let app_state = AppState::new(config.clone()).await?;

    // --- Start background tasks ---

    // Истечение неоплаченных броней
    let sweeper = app_state.expiry_sweeper();
    let interval = Duration::from_secs(config.booking.sweep_interval_seconds);
    task::spawn(sweeper.run(interval));

    // --- Start the web server ---

    let app = controllers::router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("invalid HOST/PORT")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
