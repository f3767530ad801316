use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::GeoPoint;
use crate::models::lenient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParcelStatus {
    Pending,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
}

impl ParcelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ParcelStatus::Pending => "Pending",
            ParcelStatus::OutForDelivery => "Out for Delivery",
            ParcelStatus::Delivered => "Delivered",
            ParcelStatus::Failed => "Failed",
            ParcelStatus::Returned => "Returned",
        }
    }
}

/// One administrative level, stored both as a registry code and display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressPart {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParcelAddress {
    pub region: AddressPart,
    pub province: AddressPart,
    pub municipality: AddressPart,
    pub barangay: AddressPart,
    #[serde(default)]
    pub street: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub recipient: String,
    pub address: ParcelAddress,
    #[serde(default, deserialize_with = "lenient")]
    pub destination: Option<GeoPoint>,
    pub status: ParcelStatus,
    pub driver_uid: Option<Uuid>,
    pub driver_name: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
