use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pickup_exchange::api;
use pickup_exchange::config::Config;
use pickup_exchange::error::AppError;
use pickup_exchange::geocode::ReverseGeocoder;
use pickup_exchange::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let geocoder = config.geocoder_url.clone().map(ReverseGeocoder::new);
    if geocoder.is_none() {
        tracing::info!("no GEOCODER_URL set; pickup addresses fall back to the placeholder");
    }

    let app_state = Arc::new(AppState::new(config.event_buffer_size, geocoder));
    let app = api::rest::router(app_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
