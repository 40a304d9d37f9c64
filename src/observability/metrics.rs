use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub pickups_created_total: IntCounter,
    pub pickup_transitions_total: IntCounterVec,
    pub transition_latency_seconds: HistogramVec,
    pub live_subscriptions: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pickups_created_total =
            IntCounter::new("pickups_created_total", "Total pickups scheduled")
                .expect("valid pickups_created_total metric");

        let pickup_transitions_total = IntCounterVec::new(
            Opts::new(
                "pickup_transitions_total",
                "Lifecycle transition attempts by action and outcome",
            ),
            &["action", "outcome"],
        )
        .expect("valid pickup_transitions_total metric");

        let transition_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "transition_latency_seconds",
                "Latency of lifecycle transitions in seconds",
            ),
            &["action"],
        )
        .expect("valid transition_latency_seconds metric");

        let live_subscriptions =
            IntGauge::new("live_subscriptions", "Currently open pickup feeds")
                .expect("valid live_subscriptions metric");

        registry
            .register(Box::new(pickups_created_total.clone()))
            .expect("register pickups_created_total");
        registry
            .register(Box::new(pickup_transitions_total.clone()))
            .expect("register pickup_transitions_total");
        registry
            .register(Box::new(transition_latency_seconds.clone()))
            .expect("register transition_latency_seconds");
        registry
            .register(Box::new(live_subscriptions.clone()))
            .expect("register live_subscriptions");

        Self {
            registry,
            pickups_created_total,
            pickup_transitions_total,
            transition_latency_seconds,
            live_subscriptions,
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
