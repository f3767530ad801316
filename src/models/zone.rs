use serde::{Deserialize, Serialize};

use crate::models::driver::GeoPoint;
use crate::models::{lenient, lenient_f64};

pub const ACTIVE_ZONE_CATEGORY: &str = "Slowdown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowdownZone {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<GeoPoint>,
    /// Metres.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub radius: Option<f64>,
    /// km/h.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed_limit: Option<f64>,
    #[serde(default)]
    pub category: String,
}

/// The numeric parts of a zone that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneConstraint {
    pub center: GeoPoint,
    pub radius_m: f64,
    pub speed_limit_kmh: f64,
}

impl SlowdownZone {
    /// `None` for inert zones: wrong category or any of location, radius and
    /// speed limit missing.
    pub fn constraint(&self) -> Option<ZoneConstraint> {
        if self.category != ACTIVE_ZONE_CATEGORY {
            return None;
        }

        Some(ZoneConstraint {
            center: self.location?,
            radius_m: self.radius?,
            speed_limit_kmh: self.speed_limit?,
        })
    }
}
