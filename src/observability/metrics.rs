use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub overspeeding_drivers: IntGauge,
    pub compliance_transitions_total: IntCounterVec,
    pub crosswalk_lookups_total: IntCounterVec,
    pub crosswalk_pass_seconds: HistogramVec,
    pub parcel_assignments_total: IntCounterVec,
    pub warnings_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let overspeeding_drivers = IntGauge::new(
            "overspeeding_drivers",
            "Drivers currently above their applicable speed limit",
        )
        .expect("valid overspeeding_drivers metric");

        let compliance_transitions_total = IntCounterVec::new(
            Opts::new(
                "compliance_transitions_total",
                "Driver compliance state changes by new state",
            ),
            &["state"],
        )
        .expect("valid compliance_transitions_total metric");

        let crosswalk_lookups_total = IntCounterVec::new(
            Opts::new("crosswalk_lookups_total", "Crosswalk POI lookups by outcome"),
            &["outcome"],
        )
        .expect("valid crosswalk_lookups_total metric");

        let crosswalk_pass_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "crosswalk_pass_seconds",
                "Duration of a crosswalk membership pass in seconds",
            ),
            &["outcome"],
        )
        .expect("valid crosswalk_pass_seconds metric");

        let parcel_assignments_total = IntCounterVec::new(
            Opts::new("parcel_assignments_total", "Parcel assignment writes by action"),
            &["action"],
        )
        .expect("valid parcel_assignments_total metric");

        let warnings_total = IntCounterVec::new(
            Opts::new("warnings_total", "Overspeeding warnings issued by outcome"),
            &["outcome"],
        )
        .expect("valid warnings_total metric");

        registry
            .register(Box::new(overspeeding_drivers.clone()))
            .expect("register overspeeding_drivers");
        registry
            .register(Box::new(compliance_transitions_total.clone()))
            .expect("register compliance_transitions_total");
        registry
            .register(Box::new(crosswalk_lookups_total.clone()))
            .expect("register crosswalk_lookups_total");
        registry
            .register(Box::new(crosswalk_pass_seconds.clone()))
            .expect("register crosswalk_pass_seconds");
        registry
            .register(Box::new(parcel_assignments_total.clone()))
            .expect("register parcel_assignments_total");
        registry
            .register(Box::new(warnings_total.clone()))
            .expect("register warnings_total");

        Self {
            registry,
            overspeeding_drivers,
            compliance_transitions_total,
            crosswalk_lookups_total,
            crosswalk_pass_seconds,
            parcel_assignments_total,
            warnings_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
