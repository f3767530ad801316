use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::models::parcel::{Parcel, ParcelStatus};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DriverAnalytics {
    pub driver_id: Uuid,
    pub name: String,
    pub delivered: usize,
    pub failed: usize,
    pub open: usize,
    pub violations: usize,
    pub top_speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub parcels_by_status: BTreeMap<&'static str, usize>,
    pub total_violations: usize,
    pub drivers: Vec<DriverAnalytics>,
}

pub fn summarize(drivers: &[Driver], parcels: &[Parcel]) -> AnalyticsSummary {
    let mut parcels_by_status = BTreeMap::new();
    for status in [
        ParcelStatus::Pending,
        ParcelStatus::OutForDelivery,
        ParcelStatus::Delivered,
        ParcelStatus::Failed,
        ParcelStatus::Returned,
    ] {
        parcels_by_status.insert(status.label(), 0);
    }

    let mut per_driver: HashMap<Uuid, DriverAnalytics> = drivers
        .iter()
        .map(|driver| {
            (
                driver.id,
                DriverAnalytics {
                    driver_id: driver.id,
                    name: driver.name.clone(),
                    violations: driver.violations.len(),
                    top_speed: driver.top_speed,
                    ..DriverAnalytics::default()
                },
            )
        })
        .collect();

    for parcel in parcels {
        *parcels_by_status.entry(parcel.status.label()).or_insert(0) += 1;

        let Some(stats) = parcel.driver_uid.and_then(|id| per_driver.get_mut(&id)) else {
            continue;
        };
        match parcel.status {
            ParcelStatus::Delivered => stats.delivered += 1,
            ParcelStatus::Failed | ParcelStatus::Returned => stats.failed += 1,
            ParcelStatus::Pending | ParcelStatus::OutForDelivery => stats.open += 1,
        }
    }

    let total_violations = per_driver.values().map(|stats| stats.violations).sum();
    let mut drivers: Vec<DriverAnalytics> = per_driver.into_values().collect();
    drivers.sort_by(|a, b| b.violations.cmp(&a.violations).then(a.name.cmp(&b.name)));

    AnalyticsSummary {
        parcels_by_status,
        total_violations,
        drivers,
    }
}
