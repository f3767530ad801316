use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::crosswalk::run_crosswalk_pass;
use crate::engine::speed::resolve_display_speed;
use crate::engine::zones::{applicable_limit, is_overspeeding};
use crate::error::AppError;
use crate::models::compliance::{ComplianceState, DriverCompliance};
use crate::models::driver::{Driver, GeoPoint, Violation};
use crate::models::event::MonitorEvent;
use crate::models::zone::SlowdownZone;
use crate::state::AppState;

pub fn evaluate_driver(driver: &Driver, zones: &[SlowdownZone], in_crosswalk: bool) -> DriverCompliance {
    let resolved = resolve_display_speed(driver);
    let display_speed = resolved.map(|(_, speed)| speed);
    let limit = applicable_limit(driver.location.as_ref(), zones, in_crosswalk);

    let state = match driver.location {
        None => ComplianceState::Unknown,
        Some(_) if is_overspeeding(display_speed, limit) => ComplianceState::Overspeeding,
        Some(_) => ComplianceState::Compliant,
    };

    DriverCompliance {
        driver_id: driver.id,
        driver_name: driver.name.clone(),
        state,
        display_speed,
        speed_source: resolved.map(|(field, _)| field),
        applicable_limit: limit,
        in_crosswalk,
        evaluated_at: Utc::now(),
    }
}

/// Recomputes every driver's compliance from the latest feed snapshots and
/// publishes transitions. Cheap and local; runs on every snapshot.
pub fn reevaluate(state: &AppState) -> Vec<DriverCompliance> {
    let drivers = state.feeds.drivers();
    let zones = state.feeds.zones();
    let membership = state.crosswalks.snapshot();

    let mut evaluations = Vec::with_capacity(drivers.len());
    for driver in drivers.iter() {
        let branch_zones = zones.get(&driver.branch).map(Vec::as_slice).unwrap_or(&[]);
        let evaluation = evaluate_driver(driver, branch_zones, membership.contains(&driver.id));

        let previous = state
            .compliance
            .insert(driver.id, evaluation.clone())
            .map(|previous| previous.state);

        if previous != Some(evaluation.state) {
            state
                .metrics
                .compliance_transitions_total
                .with_label_values(&[state_label(evaluation.state)])
                .inc();

            if evaluation.state == ComplianceState::Overspeeding {
                info!(
                    driver_id = %driver.id,
                    speed = evaluation.display_speed,
                    limit = evaluation.applicable_limit,
                    "driver overspeeding"
                );
            }

            state.emit(MonitorEvent::ComplianceChanged {
                driver_id: driver.id,
                previous,
                current: evaluation.state,
                display_speed: evaluation.display_speed,
                applicable_limit: evaluation.applicable_limit,
                can_warn: evaluation.can_warn(),
            });
        }

        evaluations.push(evaluation);
    }

    let live: HashSet<Uuid> = drivers.iter().map(|driver| driver.id).collect();
    state.compliance.retain(|driver_id, _| live.contains(driver_id));

    let overspeeding = evaluations
        .iter()
        .filter(|evaluation| evaluation.state == ComplianceState::Overspeeding)
        .count();
    state.metrics.overspeeding_drivers.set(overspeeding as i64);

    evaluations
}

fn state_label(state: ComplianceState) -> &'static str {
    match state {
        ComplianceState::Unknown => "unknown",
        ComplianceState::Compliant => "compliant",
        ComplianceState::Overspeeding => "overspeeding",
    }
}

/// Identity of the driver set for crosswalk purposes: who is located and where.
fn located_drivers(drivers: &[Driver]) -> Vec<(Uuid, GeoPoint)> {
    let mut located: Vec<(Uuid, GeoPoint)> = drivers
        .iter()
        .filter_map(|driver| driver.location.map(|location| (driver.id, location)))
        .collect();
    located.sort_by(|a, b| a.0.cmp(&b.0));
    located
}

/// Starts a crosswalk pass in the background when the located driver set
/// differs from the one the last pass was started for.
fn refresh_crosswalks(state: &Arc<AppState>, last_set: &mut Option<Vec<(Uuid, GeoPoint)>>) {
    let drivers = state.feeds.drivers();
    let located = located_drivers(&drivers);
    if last_set.as_ref() == Some(&located) {
        return;
    }
    *last_set = Some(located.clone());

    let state = state.clone();
    tokio::spawn(async move {
        let source = state.crosswalk_source.clone();
        run_crosswalk_pass(&state.crosswalks, source.as_ref(), located, &state.metrics).await;
    });
}

pub async fn run_compliance_monitor(state: Arc<AppState>) {
    info!("compliance monitor started");

    let mut drivers_rx = state.feeds.drivers.subscribe();
    let mut zones_rx = state.feeds.zones.subscribe();
    let mut crosswalk_rx = state.crosswalks.subscribe();
    let mut last_set = None;

    refresh_crosswalks(&state, &mut last_set);
    reevaluate(&state);

    loop {
        tokio::select! {
            changed = drivers_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                drivers_rx.borrow_and_update();
                refresh_crosswalks(&state, &mut last_set);
            }
            changed = zones_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                zones_rx.borrow_and_update();
            }
            changed = crosswalk_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                crosswalk_rx.borrow_and_update();
            }
        }

        reevaluate(&state);
    }

    warn!("compliance monitor stopped: feed closed");
}

/// Appends one violation with the driver's current metrics. Errors go back to
/// the operator; nothing is retried.
pub fn issue_warning(
    state: &AppState,
    driver_id: Uuid,
    message: Option<String>,
) -> Result<Violation, AppError> {
    let limit = state
        .compliance
        .get(&driver_id)
        .and_then(|evaluation| evaluation.applicable_limit);

    let result = {
        match state.drivers.get_mut(&driver_id) {
            None => Err(AppError::NotFound(format!("driver {driver_id} not found"))),
            Some(mut driver) => {
                let speed = resolve_display_speed(&driver).map(|(_, speed)| speed);
                let message = message
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| default_message(speed, limit));

                let violation = Violation {
                    timestamp: Utc::now(),
                    location: driver.location,
                    speed_at_issue: speed,
                    limit_at_issue: limit,
                    distance_km: driver.distance_km,
                    avg_speed: driver.avg_speed,
                    top_speed: driver.top_speed,
                    active_minutes: driver.active_minutes,
                    message,
                };
                driver.violations.push(violation.clone());
                driver.updated_at = violation.timestamp;
                Ok(violation)
            }
        }
    };

    match &result {
        Ok(violation) => {
            state.publish_drivers();
            state.metrics.warnings_total.with_label_values(&["issued"]).inc();
            state.emit(MonitorEvent::ViolationRecorded {
                driver_id,
                violation: violation.clone(),
            });
            info!(driver_id = %driver_id, speed = violation.speed_at_issue, "warning issued");
        }
        Err(err) => {
            state.metrics.warnings_total.with_label_values(&["failed"]).inc();
            warn!(driver_id = %driver_id, error = %err, "warning failed");
        }
    }

    result
}

fn default_message(speed: Option<f64>, limit: Option<f64>) -> String {
    match (speed, limit) {
        (Some(speed), Some(limit)) => {
            format!("Overspeeding: {speed:.0} km/h where the limit is {limit:.0} km/h")
        }
        (Some(speed), None) => format!("Overspeeding: {speed:.0} km/h"),
        _ => "Overspeeding warning".to_string(),
    }
}
