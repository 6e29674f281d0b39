use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_requests_total",
        "Total HTTP requests reaching the ingestion handler"
    ))
    .unwrap();
    pub static ref EVENTS_ACCEPTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_events_accepted_total",
        "Total events validated and enqueued for delivery"
    ))
    .unwrap();
    pub static ref EVENTS_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_events_rejected_total",
        "Total requests rejected as invalid client input"
    ))
    .unwrap();
    pub static ref QUEUE_FULL_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_queue_full_total",
        "Total number of times the delivery queue was full (backpressure events)"
    ))
    .unwrap();
    pub static ref MESSAGES_PUBLISHED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_messages_published_total",
        "Total messages published to the broker"
    ))
    .unwrap();
    pub static ref PUBLISH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "edge_receiver_publish_failures_total",
        "Total queued messages dropped after a failed publish"
    ))
    .unwrap();
    pub static ref PUBLISH_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "edge_receiver_publish_latency_seconds",
            "Time taken to publish a single message to the broker"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_ACCEPTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_REJECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_FULL_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MESSAGES_PUBLISHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUBLISH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUBLISH_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
