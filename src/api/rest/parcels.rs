use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matcher::{assign_parcel, unassign_parcel};
use crate::error::AppError;
use crate::feed::ParcelQuery;
use crate::models::driver::GeoPoint;
use crate::models::parcel::{Parcel, ParcelAddress, ParcelStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", post(create_parcel).get(list_parcels))
        .route("/parcels/:id", get(get_parcel))
        .route("/parcels/:id/status", patch(update_parcel_status))
        .route("/parcels/:id/assign", post(assign))
        .route("/parcels/:id/unassign", post(unassign))
}

#[derive(Deserialize)]
pub struct CreateParcelRequest {
    pub recipient: String,
    pub address: ParcelAddress,
    pub destination: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct UpdateParcelStatusRequest {
    pub status: ParcelStatus,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub driver_id: Uuid,
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateParcelRequest>,
) -> Result<Json<Parcel>, AppError> {
    if payload.recipient.trim().is_empty() {
        return Err(AppError::BadRequest("recipient cannot be empty".to_string()));
    }

    let parcel = Parcel {
        id: Uuid::new_v4(),
        recipient: payload.recipient,
        address: payload.address,
        destination: payload.destination,
        status: ParcelStatus::Pending,
        driver_uid: None,
        driver_name: None,
        assigned_at: None,
        created_at: Utc::now(),
    };

    state.parcels.insert(parcel.id, parcel.clone());
    state.publish_parcels();
    Ok(Json(parcel))
}

async fn list_parcels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParcelQuery>,
) -> Json<Vec<Parcel>> {
    let parcels = state
        .feeds
        .parcels()
        .iter()
        .filter(|parcel| query.matches(parcel))
        .cloned()
        .collect();
    Json(parcels)
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = state
        .parcels
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {} not found", id)))?;

    Ok(Json(parcel.value().clone()))
}

/// Delivery outcomes reported by the driver's client.
async fn update_parcel_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateParcelStatusRequest>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = {
        let mut parcel = state
            .parcels
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {} not found", id)))?;

        if matches!(payload.status, ParcelStatus::Pending | ParcelStatus::OutForDelivery) {
            return Err(AppError::BadRequest(
                "use assign/unassign to move a parcel back into dispatch".to_string(),
            ));
        }

        parcel.status = payload.status;
        parcel.clone()
    };

    state.publish_parcels();
    Ok(Json(parcel))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Parcel>, AppError> {
    assign_parcel(&state, id, payload.driver_id).map(Json)
}

async fn unassign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    unassign_parcel(&state, id).map(Json)
}
