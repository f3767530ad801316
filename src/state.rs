use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::crosswalk::{CrosswalkSource, CrosswalkTracker};
use crate::feed::Feeds;
use crate::models::compliance::DriverCompliance;
use crate::models::driver::Driver;
use crate::models::event::MonitorEvent;
use crate::models::parcel::Parcel;
use crate::models::zone::SlowdownZone;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub drivers: DashMap<Uuid, Driver>,
    pub parcels: DashMap<Uuid, Parcel>,
    pub zones: DashMap<String, Vec<SlowdownZone>>,
    pub compliance: DashMap<Uuid, DriverCompliance>,
    pub feeds: Feeds,
    pub crosswalks: CrosswalkTracker,
    pub crosswalk_source: Arc<dyn CrosswalkSource>,
    pub events_tx: broadcast::Sender<MonitorEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, crosswalk_source: Arc<dyn CrosswalkSource>) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            drivers: DashMap::new(),
            parcels: DashMap::new(),
            zones: DashMap::new(),
            compliance: DashMap::new(),
            feeds: Feeds::new(),
            crosswalks: CrosswalkTracker::new(),
            crosswalk_source,
            events_tx,
            metrics: Metrics::new(),
        }
    }

    // Callers must not hold a DashMap guard while publishing.

    pub fn publish_drivers(&self) {
        let mut snapshot: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        self.feeds.drivers.send_replace(Arc::new(snapshot));
    }

    pub fn publish_parcels(&self) {
        let mut snapshot: Vec<Parcel> = self
            .parcels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        self.feeds.parcels.send_replace(Arc::new(snapshot));
    }

    pub fn publish_zones(&self) {
        let snapshot: HashMap<String, Vec<SlowdownZone>> = self
            .zones
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        self.feeds.zones.send_replace(Arc::new(snapshot));
    }

    pub fn emit(&self, event: MonitorEvent) {
        let _ = self.events_tx.send(event);
    }
}
