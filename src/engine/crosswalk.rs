use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{bounding_box, distance_m, BoundingBox};
use crate::models::driver::GeoPoint;
use crate::observability::metrics::Metrics;

/// A driver this close to a crossing is treated as inside it.
pub const CROSSWALK_RADIUS_M: f64 = 15.0;
/// Half-width of the box sent to the POI source.
pub const LOOKUP_HALF_WIDTH_M: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CrossingPoint {
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait CrosswalkSource: Send + Sync {
    async fn crossings_near(&self, bbox: BoundingBox) -> Result<Vec<CrossingPoint>, AppError>;
}

/// Looks up `highway=crossing` nodes through an Overpass API endpoint.
pub struct OverpassClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    fn query(bbox: &BoundingBox) -> String {
        format!(
            "[out:json][timeout:10];node[\"highway\"=\"crossing\"]({},{},{},{});out;",
            bbox.south, bbox.west, bbox.north, bbox.east
        )
    }
}

#[async_trait]
impl CrosswalkSource for OverpassClient {
    async fn crossings_near(&self, bbox: BoundingBox) -> Result<Vec<CrossingPoint>, AppError> {
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("data", Self::query(&bbox))])
            .map_err(|err| AppError::Internal(format!("invalid overpass url: {err}")))?;

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        // Overpass answers overload and timeouts with an HTML page and a 200.
        let response: OverpassResponse = serde_json::from_str(&body)
            .map_err(|err| AppError::Upstream(format!("malformed crossing response: {err}")))?;

        Ok(response
            .elements
            .into_iter()
            .filter_map(|element| Some(CrossingPoint {
                lat: element.lat?,
                lon: element.lon?,
            }))
            .collect())
    }
}

/// Serves a fixed set of crossings. Used when live lookups are disabled.
#[derive(Debug, Clone, Default)]
pub struct StaticCrosswalkSource {
    points: Vec<CrossingPoint>,
}

impl StaticCrosswalkSource {
    pub fn new(points: Vec<CrossingPoint>) -> Self {
        Self { points }
    }
}

#[async_trait]
impl CrosswalkSource for StaticCrosswalkSource {
    async fn crossings_near(&self, bbox: BoundingBox) -> Result<Vec<CrossingPoint>, AppError> {
        Ok(self
            .points
            .iter()
            .filter(|point| {
                point.lat >= bbox.south
                    && point.lat <= bbox.north
                    && point.lon >= bbox.west
                    && point.lon <= bbox.east
            })
            .copied()
            .collect())
    }
}

pub fn within_crosswalk(location: &GeoPoint, crossings: &[CrossingPoint]) -> bool {
    crossings.iter().any(|crossing| {
        let point = GeoPoint {
            lat: crossing.lat,
            lng: crossing.lon,
        };
        distance_m(location, &point) <= CROSSWALK_RADIUS_M
    })
}

/// Crosswalk flags produced by one pass.
#[derive(Debug, Clone, Default)]
pub struct CrosswalkMembership {
    pub pass: u64,
    pub drivers: HashMap<Uuid, bool>,
}

impl CrosswalkMembership {
    pub fn contains(&self, driver_id: &Uuid) -> bool {
        self.drivers.get(driver_id).copied().unwrap_or(false)
    }
}

/// Holds the committed membership map and hands out pass numbers. Only the
/// most recently started pass may commit.
pub struct CrosswalkTracker {
    latest_pass: AtomicU64,
    membership_tx: watch::Sender<Arc<CrosswalkMembership>>,
}

impl CrosswalkTracker {
    pub fn new() -> Self {
        let (membership_tx, _unused_rx) = watch::channel(Arc::new(CrosswalkMembership::default()));
        Self {
            latest_pass: AtomicU64::new(0),
            membership_tx,
        }
    }

    pub fn begin_pass(&self) -> u64 {
        self.latest_pass.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_pass(&self) -> u64 {
        self.latest_pass.load(Ordering::SeqCst)
    }

    /// Replaces the committed map wholesale. Returns `false` and keeps the
    /// previous map when a newer pass has started.
    pub fn commit(&self, pass: u64, drivers: HashMap<Uuid, bool>) -> bool {
        self.membership_tx.send_if_modified(|current| {
            if self.latest_pass.load(Ordering::SeqCst) != pass || current.pass >= pass {
                return false;
            }
            *current = Arc::new(CrosswalkMembership { pass, drivers });
            true
        })
    }

    pub fn snapshot(&self) -> Arc<CrosswalkMembership> {
        self.membership_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CrosswalkMembership>> {
        self.membership_tx.subscribe()
    }
}

impl Default for CrosswalkTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks up every driver concurrently and commits the resulting map if no
/// newer pass started meanwhile. A failed lookup marks only that driver as
/// outside any crosswalk.
pub async fn run_crosswalk_pass(
    tracker: &CrosswalkTracker,
    source: &dyn CrosswalkSource,
    drivers: Vec<(Uuid, GeoPoint)>,
    metrics: &Metrics,
) -> bool {
    let pass = tracker.begin_pass();
    let start = Instant::now();
    let driver_count = drivers.len();

    let lookups = drivers.into_iter().map(|(driver_id, location)| async move {
        let bbox = bounding_box(&location, LOOKUP_HALF_WIDTH_M);
        let inside = match source.crossings_near(bbox).await {
            Ok(crossings) => {
                let inside = within_crosswalk(&location, &crossings);
                let outcome = if inside { "hit" } else { "miss" };
                metrics.crosswalk_lookups_total.with_label_values(&[outcome]).inc();
                inside
            }
            Err(err) => {
                metrics.crosswalk_lookups_total.with_label_values(&["error"]).inc();
                warn!(driver_id = %driver_id, error = %err, "crosswalk lookup failed");
                false
            }
        };
        (driver_id, inside)
    });

    let results: HashMap<Uuid, bool> = join_all(lookups).await.into_iter().collect();
    let committed = tracker.commit(pass, results);

    let outcome = if committed { "committed" } else { "discarded" };
    metrics
        .crosswalk_pass_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    debug!(pass, drivers = driver_count, outcome, "crosswalk pass finished");

    committed
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::{
        run_crosswalk_pass, within_crosswalk, CrossingPoint, CrosswalkSource, CrosswalkTracker,
        StaticCrosswalkSource,
    };
    use crate::error::AppError;
    use crate::geo::BoundingBox;
    use crate::models::driver::GeoPoint;
    use crate::observability::metrics::Metrics;

    const DRIVER: GeoPoint = GeoPoint {
        lat: 14.6507,
        lng: 121.0494,
    };

    // ~10 m north of DRIVER.
    const NEAR_CROSSING: CrossingPoint = CrossingPoint {
        lat: 14.65079,
        lon: 121.0494,
    };

    struct GatedSource {
        gate: Arc<Notify>,
        points: Vec<CrossingPoint>,
    }

    #[async_trait]
    impl CrosswalkSource for GatedSource {
        async fn crossings_near(&self, _bbox: BoundingBox) -> Result<Vec<CrossingPoint>, AppError> {
            self.gate.notified().await;
            Ok(self.points.clone())
        }
    }

    /// Fails for lookups whose box lies north of `failing_above`.
    struct FlakySource {
        failing_above: f64,
        points: Vec<CrossingPoint>,
    }

    #[async_trait]
    impl CrosswalkSource for FlakySource {
        async fn crossings_near(&self, bbox: BoundingBox) -> Result<Vec<CrossingPoint>, AppError> {
            if bbox.south > self.failing_above {
                return Err(AppError::Upstream("<html>rate limited</html>".to_string()));
            }
            Ok(self.points.clone())
        }
    }

    #[test]
    fn crossing_within_fifteen_metres_counts() {
        assert!(within_crosswalk(&DRIVER, &[NEAR_CROSSING]));

        let far = CrossingPoint {
            lat: 14.6509,
            lon: 121.0494,
        };
        assert!(!within_crosswalk(&DRIVER, &[far]));
        assert!(!within_crosswalk(&DRIVER, &[]));
    }

    #[tokio::test]
    async fn static_source_filters_by_bounding_box() {
        let source = StaticCrosswalkSource::new(vec![
            NEAR_CROSSING,
            CrossingPoint {
                lat: 10.0,
                lon: 120.0,
            },
        ]);
        let tracker = CrosswalkTracker::new();
        let metrics = Metrics::new();
        let driver_id = Uuid::new_v4();

        assert!(run_crosswalk_pass(&tracker, &source, vec![(driver_id, DRIVER)], &metrics).await);
        assert!(tracker.snapshot().contains(&driver_id));
    }

    #[tokio::test]
    async fn failed_lookup_is_isolated_to_its_driver() {
        let tracker = CrosswalkTracker::new();
        let metrics = Metrics::new();
        let far_north = GeoPoint {
            lat: 15.5,
            lng: 121.0494,
        };
        let source = FlakySource {
            failing_above: 15.0,
            points: vec![
                NEAR_CROSSING,
                CrossingPoint {
                    lat: far_north.lat,
                    lon: far_north.lng,
                },
            ],
        };
        let ok_driver = Uuid::new_v4();
        let failing_driver = Uuid::new_v4();

        let committed = run_crosswalk_pass(
            &tracker,
            &source,
            vec![(ok_driver, DRIVER), (failing_driver, far_north)],
            &metrics,
        )
        .await;

        assert!(committed);
        let membership = tracker.snapshot();
        assert!(membership.contains(&ok_driver));
        assert!(!membership.contains(&failing_driver));
        assert_eq!(membership.drivers.len(), 2);
    }

    #[tokio::test]
    async fn stale_pass_does_not_overwrite_newer_pass() {
        let tracker = Arc::new(CrosswalkTracker::new());
        let metrics = Metrics::new();
        let gate = Arc::new(Notify::new());
        let stale_driver = Uuid::new_v4();
        let fresh_driver = Uuid::new_v4();

        let stale = tokio::spawn({
            let tracker = tracker.clone();
            let metrics = metrics.clone();
            let source = GatedSource {
                gate: gate.clone(),
                points: vec![NEAR_CROSSING],
            };
            async move {
                run_crosswalk_pass(&tracker, &source, vec![(stale_driver, DRIVER)], &metrics).await
            }
        });

        while tracker.latest_pass() < 1 {
            tokio::task::yield_now().await;
        }

        let fresh_source = StaticCrosswalkSource::default();
        let fresh_committed =
            run_crosswalk_pass(&tracker, &fresh_source, vec![(fresh_driver, DRIVER)], &metrics).await;
        assert!(fresh_committed);

        gate.notify_one();
        let stale_committed = stale.await.unwrap();
        assert!(!stale_committed);

        let membership = tracker.snapshot();
        assert_eq!(membership.pass, 2);
        assert_eq!(membership.drivers.len(), 1);
        assert!(!membership.contains(&fresh_driver));
        assert!(!membership.drivers.contains_key(&stale_driver));
    }

    #[test]
    fn commit_for_superseded_pass_keeps_previous_map() {
        let tracker = CrosswalkTracker::new();
        let driver_id = Uuid::new_v4();

        let first = tracker.begin_pass();
        assert!(tracker.commit(first, HashMap::from([(driver_id, true)])));

        let second = tracker.begin_pass();
        let third = tracker.begin_pass();
        assert!(!tracker.commit(second, HashMap::new()));

        let membership = tracker.snapshot();
        assert_eq!(membership.pass, first);
        assert!(membership.contains(&driver_id));

        assert!(tracker.commit(third, HashMap::new()));
        assert!(!tracker.snapshot().contains(&driver_id));
    }
}
