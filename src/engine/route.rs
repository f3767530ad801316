use serde::Serialize;

use crate::geo::{format_duration, haversine_km};
use crate::models::driver::GeoPoint;

pub const DEFAULT_SPEED_KMH: f64 = 45.0;
/// Share of the cruising speed assumed for the slow estimate (traffic, stops).
pub const CONGESTION_FACTOR: f64 = 0.7;
pub const SERVICE_MINUTES_PER_STOP: f64 = 3.0;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteEstimate {
    pub stops: usize,
    pub speed_kmh: f64,
    pub optimistic_km: f64,
    pub pessimistic_km: f64,
    pub fast_minutes: f64,
    pub slow_minutes: f64,
    /// Indices into the kept destinations, nearest-neighbour order.
    pub visit_order: Vec<usize>,
}

impl RouteEstimate {
    pub fn range_label(&self) -> String {
        let fast = format_duration(self.fast_minutes / 60.0);
        let slow = format_duration(self.slow_minutes / 60.0);
        if fast == NOT_AVAILABLE || slow == NOT_AVAILABLE {
            return NOT_AVAILABLE.to_string();
        }
        format!("{fast} - {slow}")
    }
}

/// Greedy tour: from the current point always go to the closest unvisited
/// destination. Ties keep input order.
pub fn nearest_neighbor_order(origin: &GeoPoint, destinations: &[GeoPoint]) -> Vec<usize> {
    let mut visited = vec![false; destinations.len()];
    let mut order = Vec::with_capacity(destinations.len());
    let mut current = *origin;

    for _ in 0..destinations.len() {
        let next = destinations
            .iter()
            .enumerate()
            .filter(|(index, _)| !visited[*index])
            .map(|(index, point)| (index, haversine_km(&current, point)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((index, _)) = next else {
            break;
        };
        visited[index] = true;
        order.push(index);
        current = destinations[index];
    }

    order
}

pub fn path_length_km(origin: &GeoPoint, destinations: &[GeoPoint], order: &[usize]) -> f64 {
    let mut current = origin;
    let mut total = 0.0;
    for &index in order {
        let next = &destinations[index];
        total += haversine_km(current, next);
        current = next;
    }
    total
}

/// `None` when there is no origin or no destination with coordinates.
pub fn estimate_route(
    origin: Option<&GeoPoint>,
    destinations: &[Option<GeoPoint>],
    speed_kmh: Option<f64>,
) -> Option<RouteEstimate> {
    let origin = origin?;
    let stops: Vec<GeoPoint> = destinations.iter().flatten().copied().collect();
    if stops.is_empty() {
        return None;
    }

    let speed_kmh = speed_kmh
        .filter(|speed| speed.is_finite() && *speed > 0.0)
        .unwrap_or(DEFAULT_SPEED_KMH);

    let visit_order = nearest_neighbor_order(origin, &stops);
    let input_order: Vec<usize> = (0..stops.len()).collect();
    let optimistic_km = path_length_km(origin, &stops, &visit_order);
    let pessimistic_km = path_length_km(origin, &stops, &input_order);

    let service_minutes = SERVICE_MINUTES_PER_STOP * stops.len() as f64;
    let fast_minutes = optimistic_km / speed_kmh * 60.0 + service_minutes;
    let slow_minutes = pessimistic_km / (speed_kmh * CONGESTION_FACTOR) * 60.0 + service_minutes;

    Some(RouteEstimate {
        stops: stops.len(),
        speed_kmh,
        optimistic_km,
        pessimistic_km,
        fast_minutes,
        slow_minutes,
        visit_order,
    })
}

pub fn eta_label(estimate: Option<&RouteEstimate>) -> String {
    estimate
        .map(RouteEstimate::range_label)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
