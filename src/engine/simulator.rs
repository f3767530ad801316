use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::telemetry::{apply_telemetry, TelemetryUpdate};
use crate::models::driver::{DriverStatus, GeoPoint};
use crate::state::AppState;

const STEP_DEGREES: f64 = 0.0002;

/// Fake telemetry for local development. Writes through the same path as a
/// driver's own client and keeps no state of its own.
pub async fn run_location_simulator(state: Arc<AppState>, period: Duration) {
    info!(period_ms = period.as_millis() as u64, "location simulator started");

    let mut ticker = interval(period);
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        let targets: Vec<(Uuid, GeoPoint)> = state
            .drivers
            .iter()
            .filter(|entry| entry.status != DriverStatus::Offline)
            .filter_map(|entry| entry.location.map(|location| (*entry.key(), location)))
            .collect();

        for (index, (driver_id, location)) in targets.into_iter().enumerate() {
            let update = simulated_sample(&location, tick, index as u64);
            if let Err(err) = apply_telemetry(&state, driver_id, update) {
                debug!(driver_id = %driver_id, error = %err, "simulated update skipped");
            }
        }
    }
}

/// Deterministic wander: heading and speed drift with the tick so each driver
/// traces a loose loop between 5 and 55 km/h.
pub fn simulated_sample(location: &GeoPoint, tick: u64, seed: u64) -> TelemetryUpdate {
    let phase = tick as f64 * 0.15 + seed as f64 * 1.7;
    let speed = 30.0 + 25.0 * (phase * 2.0).sin();

    TelemetryUpdate {
        location: Some(GeoPoint {
            lat: location.lat + STEP_DEGREES * phase.cos(),
            lng: location.lng + STEP_DEGREES * phase.sin(),
        }),
        speed_kmh: Some(speed),
        ..TelemetryUpdate::default()
    }
}
