//! Prometheus metrics for the Collector and Rule Loader, recorded through the
//! `metrics` facade and rendered by an installed `metrics-exporter-prometheus`
//! recorder. Every family required by the external-interfaces spec is emitted
//! here; nothing records metrics directly, so the label set stays centralized.

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder and return a handle whose
/// `render()` produces the text exposition format served at `/metrics`.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder")
}

/// `collector_requests_total{status}` — exactly one increment per acknowledged
/// capture, recorded once by whichever stage decides the outcome (`accepted`,
/// `duplicate`, `validation_error`, `backpressure`, `leak`, `queue_push_failed`).
pub fn record_request(status: &str) {
    metrics::counter!("collector_requests_total", "status" => status.to_string()).increment(1);
}

/// `collector_request_duration_seconds` — per-capture pipeline latency.
pub fn record_request_duration(duration: Duration) {
    metrics::histogram!("collector_request_duration_seconds").record(duration.as_secs_f64());
}

/// `collector_sanitization_operations_total{pattern}` — one increment per
/// pattern name for every match made while sanitizing a capture.
pub fn record_sanitization(pattern: &str, count: u32) {
    metrics::counter!("collector_sanitization_operations_total", "pattern" => pattern.to_string())
        .increment(count as u64);
}

/// `sanitizer.leak_detected` equivalent: incremented when the post-sanitization
/// re-scan still matches a pattern and the capture is dropped fail-closed.
pub fn record_leak_detected() {
    metrics::counter!("collector_sanitizer_leak_detected_total").increment(1);
}

/// Incremented when an ingested body is truncated to `max_body_bytes`.
pub fn record_body_truncated() {
    metrics::counter!("collector_body_truncated_total").increment(1);
}

/// `collector_deduplication_operations_total{result}` — `fresh` or `duplicate`.
pub fn record_dedup(result: &str) {
    metrics::counter!("collector_deduplication_operations_total", "result" => result.to_string()).increment(1);
}

/// `collector_queue_depth` — current Redis list length, polled periodically.
pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("collector_queue_depth").set(depth as f64);
}

/// `rule_loader_mappings_processed_total{status}` — `success` or `dead_lettered`.
pub fn record_mapping_processed(status: &str) {
    metrics::counter!("rule_loader_mappings_processed_total", "status" => status.to_string()).increment(1);
}

/// `rule_loader_install_duration_seconds` — per-install latency against the
/// mock server's admin API, including retries.
pub fn record_install_duration(duration: Duration) {
    metrics::histogram!("rule_loader_install_duration_seconds").record(duration.as_secs_f64());
}

/// `rule_loader_errors_total{kind}` — `transient` or `permanent`.
pub fn record_install_error(kind: &str) {
    metrics::counter!("rule_loader_errors_total", "kind" => kind.to_string()).increment(1);
}
