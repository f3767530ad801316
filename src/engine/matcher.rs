use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{Driver, RouteDescriptor};
use crate::models::event::MonitorEvent;
use crate::models::parcel::{Parcel, ParcelAddress, ParcelStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct DriverWorkload {
    pub assignable: Vec<Parcel>,
    pub assigned: Vec<Parcel>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// All four administrative levels must agree.
pub fn route_matches(address: &ParcelAddress, route: &RouteDescriptor) -> bool {
    same_name(&address.region.name, &route.region)
        && same_name(&address.province.name, &route.province)
        && same_name(&address.municipality.name, &route.municipality)
        && same_name(&address.barangay.name, &route.barangay)
}

pub fn is_assignable(parcel: &Parcel, driver: &Driver) -> bool {
    parcel.status != ParcelStatus::Delivered
        && parcel.driver_uid.is_none()
        && driver
            .preferred_routes
            .iter()
            .any(|route| route_matches(&parcel.address, route))
}

pub fn is_assigned_to(parcel: &Parcel, driver_id: &Uuid) -> bool {
    parcel.status != ParcelStatus::Delivered && parcel.driver_uid.as_ref() == Some(driver_id)
}

pub fn partition_parcels<'a>(
    parcels: impl IntoIterator<Item = &'a Parcel>,
    driver: &Driver,
) -> DriverWorkload {
    let mut workload = DriverWorkload {
        assignable: Vec::new(),
        assigned: Vec::new(),
    };

    for parcel in parcels {
        if is_assigned_to(parcel, &driver.id) {
            workload.assigned.push(parcel.clone());
        } else if is_assignable(parcel, driver) {
            workload.assignable.push(parcel.clone());
        }
    }

    workload
}

/// Writes driver, assignment time and status in one record update. A parcel
/// already held by another driver is taken over: the last write wins.
pub fn assign_parcel(state: &AppState, parcel_id: Uuid, driver_id: Uuid) -> Result<Parcel, AppError> {
    let driver_name = state
        .drivers
        .get(&driver_id)
        .map(|driver| driver.name.clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    let updated = {
        let mut parcel = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;

        if parcel.status == ParcelStatus::Delivered {
            return Err(AppError::Conflict(format!("parcel {parcel_id} is already delivered")));
        }

        parcel.driver_uid = Some(driver_id);
        parcel.driver_name = Some(driver_name);
        parcel.assigned_at = Some(Utc::now());
        parcel.status = ParcelStatus::OutForDelivery;
        parcel.clone()
    };

    state.publish_parcels();
    state
        .metrics
        .parcel_assignments_total
        .with_label_values(&["assign"])
        .inc();
    if let Some(assigned_at) = updated.assigned_at {
        state.emit(MonitorEvent::ParcelAssigned {
            parcel_id,
            driver_id,
            assigned_at,
        });
    }

    info!(parcel_id = %parcel_id, driver_id = %driver_id, "parcel assigned");
    Ok(updated)
}

pub fn unassign_parcel(state: &AppState, parcel_id: Uuid) -> Result<Parcel, AppError> {
    let (updated, previous_driver) = {
        let mut parcel = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;

        if parcel.status == ParcelStatus::Delivered {
            return Err(AppError::Conflict(format!("parcel {parcel_id} is already delivered")));
        }

        let previous_driver = parcel.driver_uid.take();
        parcel.driver_name = None;
        parcel.assigned_at = None;
        parcel.status = ParcelStatus::Pending;
        (parcel.clone(), previous_driver)
    };

    state.publish_parcels();
    state
        .metrics
        .parcel_assignments_total
        .with_label_values(&["unassign"])
        .inc();
    state.emit(MonitorEvent::ParcelUnassigned {
        parcel_id,
        previous_driver,
    });

    info!(parcel_id = %parcel_id, "parcel unassigned");
    Ok(updated)
}
