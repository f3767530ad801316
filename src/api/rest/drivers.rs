use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::matcher::{partition_parcels, DriverWorkload};
use crate::engine::monitor::issue_warning;
use crate::engine::route::{eta_label, estimate_route, RouteEstimate};
use crate::engine::speed::display_speed;
use crate::engine::telemetry::{apply_telemetry, TelemetryUpdate};
use crate::error::AppError;
use crate::feed::DriverQuery;
use crate::models::driver::{Driver, DriverStatus, GeoPoint, RouteDescriptor, Violation};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/telemetry", patch(update_driver_telemetry))
        .route("/drivers/:id/routes", put(replace_preferred_routes))
        .route("/drivers/:id/parcels", get(driver_parcels))
        .route("/drivers/:id/eta", get(driver_eta))
        .route("/drivers/:id/warnings", post(give_warning))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub branch: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub preferred_routes: Vec<RouteDescriptor>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct ReplaceRoutesRequest {
    pub preferred_routes: Vec<RouteDescriptor>,
}

#[derive(Deserialize)]
pub struct EtaQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Serialize)]
pub struct EtaResponse {
    pub driver_id: Uuid,
    pub eta: String,
    pub estimate: Option<RouteEstimate>,
}

#[derive(Deserialize, Default)]
pub struct WarningRequest {
    pub message: Option<String>,
}

fn load_driver(state: &AppState, id: Uuid) -> Result<Driver, AppError> {
    state
        .drivers
        .get(&id)
        .map(|driver| driver.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.branch.trim().is_empty() {
        return Err(AppError::BadRequest("branch cannot be empty".to_string()));
    }

    let mut driver = Driver::new(payload.name, payload.branch, payload.location);
    driver.set_preferred_routes(payload.preferred_routes);

    state.drivers.insert(driver.id, driver.clone());
    state.publish_drivers();
    Ok(Json(driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverQuery>,
) -> Json<Vec<Driver>> {
    let drivers = state
        .feeds
        .drivers()
        .iter()
        .filter(|driver| query.matches(driver))
        .cloned()
        .collect();
    Json(drivers)
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    load_driver(&state, id).map(Json)
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = {
        let mut driver = state
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

        driver.status = payload.status;
        driver.updated_at = Utc::now();
        driver.clone()
    };

    state.publish_drivers();
    Ok(Json(driver))
}

async fn update_driver_telemetry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TelemetryUpdate>,
) -> Result<Json<Driver>, AppError> {
    apply_telemetry(&state, id, payload).map(Json)
}

async fn replace_preferred_routes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceRoutesRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = {
        let mut driver = state
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

        driver.set_preferred_routes(payload.preferred_routes);
        driver.updated_at = Utc::now();
        driver.clone()
    };

    state.publish_drivers();
    Ok(Json(driver))
}

async fn driver_parcels(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverWorkload>, AppError> {
    let driver = load_driver(&state, id)?;
    let parcels = state.feeds.parcels();
    Ok(Json(partition_parcels(parcels.iter(), &driver)))
}

/// Trip estimate from the operator's position, or the driver's own when the
/// query carries no coordinates, through the driver's open parcels.
async fn driver_eta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<EtaQuery>,
) -> Result<Json<EtaResponse>, AppError> {
    let driver = load_driver(&state, id)?;

    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        (None, None) => driver.location,
        _ => return Err(AppError::BadRequest("lat and lng must be given together".to_string())),
    };

    let parcels = state.feeds.parcels();
    let mut workload = partition_parcels(parcels.iter(), &driver).assigned;
    workload.sort_by_key(|parcel| parcel.assigned_at);
    let destinations: Vec<Option<GeoPoint>> = workload.iter().map(|parcel| parcel.destination).collect();

    let estimate = estimate_route(origin.as_ref(), &destinations, display_speed(&driver));

    Ok(Json(EtaResponse {
        driver_id: id,
        eta: eta_label(estimate.as_ref()),
        estimate,
    }))
}

async fn give_warning(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<WarningRequest>>,
) -> Result<Json<Violation>, AppError> {
    let message = payload.and_then(|Json(request)| request.message);
    issue_warning(&state, id, message).map(Json)
}
