use crate::models::driver::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const METRES_PER_DEGREE_LAT: f64 = 111_320.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(&GeoPoint { lat: lat1, lng: lon1 }, &GeoPoint { lat: lat2, lng: lon2 })
}

pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_km(a, b) * 1_000.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Square-ish box extending `half_width_m` from `center` on every side.
pub fn bounding_box(center: &GeoPoint, half_width_m: f64) -> BoundingBox {
    let delta_lat = half_width_m / METRES_PER_DEGREE_LAT;
    let delta_lng = half_width_m / (METRES_PER_DEGREE_LAT * center.lat.to_radians().cos().max(1e-6));

    BoundingBox {
        south: center.lat - delta_lat,
        west: center.lng - delta_lng,
        north: center.lat + delta_lat,
        east: center.lng + delta_lng,
    }
}

/// Renders fractional hours as `"1h 5m"` or `"12m"`.
pub fn format_duration(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "N/A".to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    let h = total_minutes / 60;
    let m = total_minutes % 60;

    if h == 0 {
        format!("{m}m")
    } else {
        format!("{h}h {m}m")
    }
}
