use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

mod app;
mod app_state;
mod auth;
mod config;
mod db;
mod error;
mod lifecycle;
mod middleware;
mod modules;
mod telemetry;
mod uploads;

use app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init()?.clone();
    let _telemetry = telemetry::init_telemetry(None).await?;

    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .context("Failed to create uploads directory")?;

    let pool = db::init_pool().await?;
    let state = AppState::new(pool, config.clone());
    let app = app::create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
