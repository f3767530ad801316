use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::compliance::ComplianceState;
use crate::models::driver::Violation;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    ComplianceChanged {
        driver_id: Uuid,
        previous: Option<ComplianceState>,
        current: ComplianceState,
        display_speed: Option<f64>,
        applicable_limit: Option<f64>,
        can_warn: bool,
    },
    ParcelAssigned {
        parcel_id: Uuid,
        driver_id: Uuid,
        assigned_at: DateTime<Utc>,
    },
    ParcelUnassigned {
        parcel_id: Uuid,
        previous_driver: Option<Uuid>,
    },
    ViolationRecorded {
        driver_id: Uuid,
        violation: Violation,
    },
}
