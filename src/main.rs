mod api;
mod config;
mod engine;
mod error;
mod feed;
mod geo;
mod models;
mod observability;
mod state;

use std::sync::Arc;

use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::engine::crosswalk::{CrosswalkSource, OverpassClient, StaticCrosswalkSource};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let crosswalk_source: Arc<dyn CrosswalkSource> = if config.crosswalk_lookups {
        Arc::new(OverpassClient::new(config.overpass_url.clone())?)
    } else {
        tracing::warn!("crosswalk lookups disabled; no driver will be flagged near a crossing");
        Arc::new(StaticCrosswalkSource::default())
    };

    let shared_state = Arc::new(state::AppState::new(
        config.event_buffer_size,
        crosswalk_source,
    ));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::monitor::run_compliance_monitor(shared_state.clone()));

    if config.simulator_enabled {
        tokio::spawn(engine::simulator::run_location_simulator(
            shared_state.clone(),
            Duration::from_millis(config.simulator_interval_ms),
        ));
    }

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        overpass_url = %config.overpass_url,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
