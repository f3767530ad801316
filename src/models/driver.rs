use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{lenient, lenient_f64};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Available,
    Delivering,
    Offline,
}

/// An address a driver is pre-approved to service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub region: String,
    pub province: String,
    pub municipality: String,
    pub barangay: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub speed_at_issue: Option<f64>,
    pub limit_at_issue: Option<f64>,
    pub distance_km: Option<f64>,
    pub avg_speed: Option<f64>,
    pub top_speed: Option<f64>,
    pub active_minutes: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub status: DriverStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub last_location_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed_kmh: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub top_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_km: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub active_minutes: Option<f64>,
    #[serde(default)]
    pub preferred_routes: Vec<RouteDescriptor>,
    #[serde(default)]
    pub violations: Vec<Violation>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(name: String, branch: String, location: Option<GeoPoint>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            branch,
            status: DriverStatus::Available,
            last_location_at: location.map(|_| now),
            location,
            speed_kmh: None,
            speed: None,
            avg_speed: None,
            top_speed: None,
            distance_km: None,
            active_minutes: None,
            preferred_routes: Vec::new(),
            violations: Vec::new(),
            updated_at: now,
        }
    }

    /// Replaces the preferred routes, dropping duplicates while keeping the
    /// first occurrence's position.
    pub fn set_preferred_routes(&mut self, routes: Vec<RouteDescriptor>) {
        let mut unique: Vec<RouteDescriptor> = Vec::with_capacity(routes.len());
        for route in routes {
            if !unique.contains(&route) {
                unique.push(route);
            }
        }
        self.preferred_routes = unique;
    }
}
