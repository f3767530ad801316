use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComplianceState {
    Unknown,
    Compliant,
    Overspeeding,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverCompliance {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub state: ComplianceState,
    pub display_speed: Option<f64>,
    pub speed_source: Option<&'static str>,
    pub applicable_limit: Option<f64>,
    pub in_crosswalk: bool,
    pub evaluated_at: DateTime<Utc>,
}

impl DriverCompliance {
    /// Overspeeding drivers expose the "give warning" action to operators.
    pub fn can_warn(&self) -> bool {
        self.state == ComplianceState::Overspeeding
    }
}
