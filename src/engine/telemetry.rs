use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::speed::display_speed;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::driver::{Driver, GeoPoint};
use crate::state::AppState;

/// Partial update pushed by a driver's own client. Absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryUpdate {
    pub location: Option<GeoPoint>,
    pub speed_kmh: Option<f64>,
    pub speed: Option<f64>,
    pub avg_speed: Option<f64>,
    pub distance_km: Option<f64>,
    pub active_minutes: Option<f64>,
}

pub fn apply_telemetry_to(driver: &mut Driver, update: TelemetryUpdate) {
    let now = Utc::now();

    if let Some(location) = update.location {
        if update.distance_km.is_none() {
            if let Some(previous) = driver.location {
                let travelled = haversine_km(&previous, &location);
                driver.distance_km = Some(driver.distance_km.unwrap_or(0.0) + travelled);
            }
        }
        driver.location = Some(location);
        driver.last_location_at = Some(now);
    }

    if update.speed_kmh.is_some() {
        driver.speed_kmh = update.speed_kmh;
    }
    if update.speed.is_some() {
        driver.speed = update.speed;
    }
    if update.avg_speed.is_some() {
        driver.avg_speed = update.avg_speed;
    }
    if update.distance_km.is_some() {
        driver.distance_km = update.distance_km;
    }
    if update.active_minutes.is_some() {
        driver.active_minutes = update.active_minutes;
    }

    if let Some(current) = display_speed(driver) {
        driver.top_speed = Some(driver.top_speed.map_or(current, |top| top.max(current)));
    }

    driver.updated_at = now;
}

pub fn apply_telemetry(
    state: &AppState,
    driver_id: Uuid,
    update: TelemetryUpdate,
) -> Result<Driver, AppError> {
    if let Some(location) = &update.location {
        if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lng) {
            return Err(AppError::BadRequest("location out of range".to_string()));
        }
    }

    let updated = {
        let mut driver = state
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
        apply_telemetry_to(&mut driver, update);
        driver.clone()
    };

    state.publish_drivers();
    Ok(updated)
}
