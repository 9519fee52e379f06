use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all backlink server metrics
const PREFIX: &str = "backlink";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Trackback Metrics
    pub static ref INBOUND_PINGS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_inbound_pings_total"), "Inbound pings by outcome"),
        &["outcome"]
    ).expect("Failed to create inbound_pings_total metric");

    pub static ref THROTTLE_BLOCKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_throttle_blocks_total"), "IP blocks applied by kind"),
        &["kind"]
    ).expect("Failed to create throttle_blocks_total metric");

    pub static ref OUTBOUND_DELIVERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_outbound_deliveries_total"), "Outbound pings by result"),
        &["result"]
    ).expect("Failed to create outbound_deliveries_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INBOUND_PINGS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(THROTTLE_BLOCKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(OUTBOUND_DELIVERIES_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses numeric path segments so per-entry urls share one label.
pub fn categorize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_inbound_ping(outcome: &str) {
    INBOUND_PINGS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_throttle_block(kind: &str) {
    THROTTLE_BLOCKS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_outbound_delivery(result: &str) {
    OUTBOUND_DELIVERIES_TOTAL.with_label_values(&[result]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
