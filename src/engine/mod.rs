pub mod analytics;
pub mod crosswalk;
pub mod matcher;
pub mod monitor;
pub mod route;
pub mod simulator;
pub mod speed;
pub mod telemetry;
pub mod zones;
