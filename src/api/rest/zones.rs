use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::models::zone::SlowdownZone;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/branches/:branch/zones", get(get_zones).put(replace_zones))
}

/// The branch document as stored; only its zone list is read here.
#[derive(Deserialize)]
pub struct BranchZonesDocument {
    #[serde(default)]
    pub zones: Vec<SlowdownZone>,
}

async fn get_zones(
    State(state): State<Arc<AppState>>,
    Path(branch): Path<String>,
) -> Result<Json<Vec<SlowdownZone>>, AppError> {
    let zones = state
        .zones
        .get(&branch)
        .ok_or_else(|| AppError::NotFound(format!("branch {} has no zones", branch)))?;

    Ok(Json(zones.value().clone()))
}

async fn replace_zones(
    State(state): State<Arc<AppState>>,
    Path(branch): Path<String>,
    Json(payload): Json<BranchZonesDocument>,
) -> Result<Json<Vec<SlowdownZone>>, AppError> {
    if branch.trim().is_empty() {
        return Err(AppError::BadRequest("branch cannot be empty".to_string()));
    }

    let active = payload
        .zones
        .iter()
        .filter(|zone| zone.constraint().is_some())
        .count();
    info!(branch = %branch, zones = payload.zones.len(), active, "zones replaced");

    state.zones.insert(branch, payload.zones.clone());
    state.publish_zones();
    Ok(Json(payload.zones))
}
