pub mod drivers;
pub mod parcels;
pub mod ws;
pub mod zones;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::engine::analytics::{summarize, AnalyticsSummary};
use crate::models::compliance::DriverCompliance;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(drivers::router())
        .merge(parcels::router())
        .merge(zones::router())
        .route("/compliance", get(compliance))
        .route("/analytics", get(analytics))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    drivers: usize,
    parcels: usize,
    branches: usize,
    crosswalk_pass: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        drivers: state.drivers.len(),
        parcels: state.parcels.len(),
        branches: state.zones.len(),
        crosswalk_pass: state.crosswalks.snapshot().pass,
    })
}

async fn compliance(State(state): State<Arc<AppState>>) -> Json<Vec<DriverCompliance>> {
    let mut evaluations: Vec<DriverCompliance> = state
        .compliance
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    evaluations.sort_by(|a, b| a.driver_name.cmp(&b.driver_name));
    Json(evaluations)
}

async fn analytics(State(state): State<Arc<AppState>>) -> Json<AnalyticsSummary> {
    let drivers = state.feeds.drivers();
    let parcels = state.feeds.parcels();
    Json(summarize(&drivers, &parcels))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
