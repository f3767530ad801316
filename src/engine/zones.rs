use crate::geo::distance_m;
use crate::models::driver::GeoPoint;
use crate::models::zone::SlowdownZone;

/// Speed cap near a pedestrian crossing, regardless of authored zones.
pub const CROSSWALK_SPEED_LIMIT_KMH: f64 = 10.0;

/// Inclusive: a driver exactly `radius` metres from the center is inside.
pub fn zone_matches(zone: &SlowdownZone, location: &GeoPoint) -> bool {
    zone.constraint()
        .is_some_and(|constraint| distance_m(&constraint.center, location) <= constraint.radius_m)
}

/// Lowest limit among matching zones and the crosswalk cap, or `None` when the
/// driver is unrestricted.
pub fn applicable_limit(
    location: Option<&GeoPoint>,
    zones: &[SlowdownZone],
    in_crosswalk: bool,
) -> Option<f64> {
    let zone_limits = zones
        .iter()
        .filter(|zone| location.is_some_and(|location| zone_matches(zone, location)))
        .filter_map(|zone| zone.constraint().map(|constraint| constraint.speed_limit_kmh));

    let crosswalk_limit = in_crosswalk.then_some(CROSSWALK_SPEED_LIMIT_KMH);

    zone_limits
        .chain(crosswalk_limit)
        .min_by(|a, b| a.total_cmp(b))
}

pub fn is_overspeeding(display_speed: Option<f64>, limit: Option<f64>) -> bool {
    match (display_speed, limit) {
        (Some(speed), Some(limit)) => limit > 0.0 && speed > limit,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{applicable_limit, is_overspeeding, zone_matches, CROSSWALK_SPEED_LIMIT_KMH};
    use crate::geo::distance_m;
    use crate::models::driver::GeoPoint;
    use crate::models::zone::SlowdownZone;

    const CENTER: GeoPoint = GeoPoint {
        lat: 14.6507,
        lng: 121.0494,
    };

    fn zone(radius: f64, speed_limit: f64) -> SlowdownZone {
        SlowdownZone {
            name: "school".to_string(),
            location: Some(CENTER),
            radius: Some(radius),
            speed_limit: Some(speed_limit),
            category: "Slowdown".to_string(),
        }
    }

    #[test]
    fn boundary_distance_is_inside_the_zone() {
        let driver = GeoPoint {
            lat: 14.6520,
            lng: 121.0494,
        };
        let exact = distance_m(&CENTER, &driver);

        assert!(zone_matches(&zone(exact, 30.0), &driver));
        assert!(!zone_matches(&zone(exact - 1.0, 30.0), &driver));
    }

    #[test]
    fn crosswalk_cap_wins_over_looser_zone() {
        let zones = vec![zone(500.0, 20.0)];
        let limit = applicable_limit(Some(&CENTER), &zones, true);
        assert_eq!(limit, Some(CROSSWALK_SPEED_LIMIT_KMH));
    }

    #[test]
    fn tightest_matching_zone_applies() {
        let zones = vec![zone(500.0, 40.0), zone(200.0, 25.0), zone(800.0, 60.0)];
        assert_eq!(applicable_limit(Some(&CENTER), &zones, false), Some(25.0));
    }

    #[test]
    fn inert_and_distant_zones_do_not_apply() {
        let mut inert = zone(500.0, 5.0);
        inert.speed_limit = None;
        let mut wrong_category = zone(500.0, 5.0);
        wrong_category.category = "Parking".to_string();
        let far_away = GeoPoint {
            lat: 14.70,
            lng: 121.10,
        };
        let distant = SlowdownZone {
            location: Some(far_away),
            ..zone(100.0, 5.0)
        };

        let limit = applicable_limit(Some(&CENTER), &[inert, wrong_category, distant], false);
        assert_eq!(limit, None);
    }

    #[test]
    fn unknown_location_only_gets_crosswalk_cap() {
        let zones = vec![zone(500.0, 20.0)];
        assert_eq!(applicable_limit(None, &zones, false), None);
        assert_eq!(applicable_limit(None, &zones, true), Some(10.0));
    }

    #[test]
    fn overspeeding_is_strictly_above_limit() {
        assert!(!is_overspeeding(Some(60.0), Some(60.0)));
        assert!(is_overspeeding(Some(61.0), Some(60.0)));
        assert!(!is_overspeeding(None, Some(60.0)));
        assert!(!is_overspeeding(Some(61.0), None));
        assert!(!is_overspeeding(Some(5.0), Some(0.0)));
    }
}
