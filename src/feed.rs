use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;

use crate::models::driver::{Driver, DriverStatus};
use crate::models::parcel::{Parcel, ParcelStatus};
use crate::models::zone::SlowdownZone;

pub type Snapshot<T> = Arc<Vec<T>>;
pub type ZoneSnapshot = Arc<HashMap<String, Vec<SlowdownZone>>>;

/// Realtime feeds. Every publish replaces the whole snapshot; subscribers
/// recompute from scratch and must not assume ordering across feeds.
pub struct Feeds {
    pub drivers: watch::Sender<Snapshot<Driver>>,
    pub parcels: watch::Sender<Snapshot<Parcel>>,
    pub zones: watch::Sender<ZoneSnapshot>,
}

impl Feeds {
    pub fn new() -> Self {
        let (drivers, _unused_drivers_rx) = watch::channel(Arc::new(Vec::new()));
        let (parcels, _unused_parcels_rx) = watch::channel(Arc::new(Vec::new()));
        let (zones, _unused_zones_rx) = watch::channel(Arc::new(HashMap::new()));

        Self {
            drivers,
            parcels,
            zones,
        }
    }

    pub fn drivers(&self) -> Snapshot<Driver> {
        self.drivers.borrow().clone()
    }

    pub fn parcels(&self) -> Snapshot<Parcel> {
        self.parcels.borrow().clone()
    }

    pub fn zones(&self) -> ZoneSnapshot {
        self.zones.borrow().clone()
    }
}

impl Default for Feeds {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DriverQuery {
    pub branch: Option<String>,
    pub status: Option<DriverStatus>,
}

impl DriverQuery {
    pub fn matches(&self, driver: &Driver) -> bool {
        self.branch.as_ref().is_none_or(|branch| &driver.branch == branch)
            && self.status.is_none_or(|status| driver.status == status)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ParcelQuery {
    pub status: Option<ParcelStatus>,
}

impl ParcelQuery {
    pub fn matches(&self, parcel: &Parcel) -> bool {
        self.status.is_none_or(|status| parcel.status == status)
    }
}
