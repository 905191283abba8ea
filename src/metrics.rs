/// Metrics and telemetry for the points ledger
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Ledger operation outcomes
/// - Points granted, transferred and spent

use crate::error::LedgerError;
use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("metric can be registered");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric can be registered");

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .expect("metric can be registered");

    // ========== Ledger Metrics ==========

    /// Ledger operations by operation and outcome
    pub static ref LEDGER_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ledger_operations_total",
        "Total number of ledger operations",
        &["operation", "outcome"]
    )
    .expect("metric can be registered");

    /// Points moved by kind (granted, transferred, spent)
    pub static ref POINTS_TOTAL: CounterVec = register_counter_vec!(
        "ledger_points_total",
        "Total points moved through the ledger",
        &["kind"]
    )
    .expect("metric can be registered");
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record the outcome of a ledger operation
pub fn record_operation(operation: &str, outcome: &str) {
    LEDGER_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a failed ledger operation, labelled by error class
pub fn record_failure(operation: &str, error: &LedgerError) {
    let outcome = match error {
        LedgerError::Conflict(_) => "conflict",
        LedgerError::NotFound(_) => "not_found",
        LedgerError::Validation(_) => "invalid",
        LedgerError::Authentication(_) => "unauthorized",
        _ => "error",
    };
    record_operation(operation, outcome);
}

/// Record points moved through the ledger
pub fn record_points(kind: &str, points: f64) {
    POINTS_TOTAL.with_label_values(&[kind]).inc_by(points);
}

/// Middleware recording request counts and latencies
pub async fn track_http(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    HTTP_REQUESTS_ACTIVE.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_ACTIVE.dec();

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
