use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub searches_total: IntCounterVec,
    pub estimates_total: IntCounterVec,
    pub orders_finalized_total: IntCounterVec,
    pub operation_latency_seconds: HistogramVec,
    pub route_stops: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let searches_total = IntCounterVec::new(
            Opts::new("searches_total", "Nearby merchant searches by outcome"),
            &["outcome"],
        )
        .expect("valid searches_total metric");

        let estimates_total = IntCounterVec::new(
            Opts::new("estimates_total", "Delivery estimates by outcome"),
            &["outcome"],
        )
        .expect("valid estimates_total metric");

        let orders_finalized_total = IntCounterVec::new(
            Opts::new("orders_finalized_total", "Order finalizations by outcome"),
            &["outcome"],
        )
        .expect("valid orders_finalized_total metric");

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of engine operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid operation_latency_seconds metric");

        let route_stops = Histogram::with_opts(
            HistogramOpts::new("route_stops", "Stops per approximated route")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
        )
        .expect("valid route_stops metric");

        registry
            .register(Box::new(searches_total.clone()))
            .expect("register searches_total");
        registry
            .register(Box::new(estimates_total.clone()))
            .expect("register estimates_total");
        registry
            .register(Box::new(orders_finalized_total.clone()))
            .expect("register orders_finalized_total");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("register operation_latency_seconds");
        registry
            .register(Box::new(route_stops.clone()))
            .expect("register route_stops");

        Self {
            registry,
            searches_total,
            estimates_total,
            orders_finalized_total,
            operation_latency_seconds,
            route_stops,
        }
    }

    /// Records one call of `operation`: latency plus an outcome counter.
    pub fn observe(&self, counter: &IntCounterVec, operation: &str, outcome: &str, elapsed: f64) {
        self.operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed);
        counter.with_label_values(&[outcome]).inc();
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
