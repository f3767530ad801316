use crate::models::driver::Driver;

type SpeedAccessor = fn(&Driver) -> Option<f64>;
type SpeedPredicate = fn(f64) -> bool;

struct SpeedSource {
    field: &'static str,
    read: SpeedAccessor,
    accept: SpeedPredicate,
}

/// Raw speed fields in priority order. Older driver clients only write
/// `speed`; some only report a rolling `avg_speed`.
const SPEED_SOURCES: [SpeedSource; 3] = [
    SpeedSource {
        field: "speed_kmh",
        read: |driver| driver.speed_kmh,
        accept: f64::is_finite,
    },
    SpeedSource {
        field: "speed",
        read: |driver| driver.speed,
        accept: f64::is_finite,
    },
    SpeedSource {
        field: "avg_speed",
        read: |driver| driver.avg_speed,
        accept: f64::is_finite,
    },
];

/// The resolved speed shown to operators together with the field it came from.
pub fn resolve_display_speed(driver: &Driver) -> Option<(&'static str, f64)> {
    SPEED_SOURCES.iter().find_map(|source| {
        (source.read)(driver)
            .filter(|value| (source.accept)(*value))
            .map(|value| (source.field, value))
    })
}

pub fn display_speed(driver: &Driver) -> Option<f64> {
    resolve_display_speed(driver).map(|(_, speed)| speed)
}
