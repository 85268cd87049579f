//! Prometheus Metrics Definitions
//!
//! Defines all Roscoe metrics with their labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<RoscoeMetrics>> = Lazy::new(RoscoeMetrics::new);

/// The registered metrics, or `None` when registration failed.
pub fn metrics() -> Option<&'static RoscoeMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all Roscoe metrics.
#[derive(Clone)]
pub struct RoscoeMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Records fetched by the current or last sync run
    pub sync_records_total: Gauge,

    /// Records written to staging by the current or last sync run
    pub sync_records_synced: Gauge,

    /// Sync batch counter - labels: status (success/error)
    pub sync_batches_total: CounterVec,

    /// Queue admission counter - labels: outcome
    pub queue_admissions_total: CounterVec,

    /// Resolved lookup ids - labels: result (none/live/queued)
    pub flag_lookups_total: CounterVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl RoscoeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "roscoe_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "roscoe_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            sync_records_total: register_gauge!(
                "roscoe_sync_records_total",
                "Records fetched from the primary store by the current sync run"
            )
            .map_err(|e| registration_error("sync_records_total", e))?,

            sync_records_synced: register_gauge!(
                "roscoe_sync_records_synced",
                "Records written to staging by the current sync run"
            )
            .map_err(|e| registration_error("sync_records_synced", e))?,

            sync_batches_total: register_counter_vec!(
                "roscoe_sync_batches_total",
                "Total sync batches written",
                &["status"]
            )
            .map_err(|e| registration_error("sync_batches_total", e))?,

            queue_admissions_total: register_counter_vec!(
                "roscoe_queue_admissions_total",
                "Queue admission attempts by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_error("queue_admissions_total", e))?,

            flag_lookups_total: register_counter_vec!(
                "roscoe_flag_lookups_total",
                "Ids resolved by flag lookups",
                &["result"]
            )
            .map_err(|e| registration_error("flag_lookups_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Reset the sync gauges at the start of a run.
    pub fn sync_started(&self, total: usize) {
        self.sync_records_total.set(total as f64);
        self.sync_records_synced.set(0.0);
    }

    /// Record one finished sync batch.
    pub fn record_sync_batch(&self, success: bool, synced_so_far: usize) {
        let status = if success { "success" } else { "error" };
        self.sync_batches_total.with_label_values(&[status]).inc();
        if success {
            self.sync_records_synced.set(synced_so_far as f64);
        }
    }

    /// Record a queue admission outcome.
    pub fn record_admission(&self, outcome: &str) {
        self.queue_admissions_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record `count` ids resolved to `result`.
    pub fn record_lookup(&self, result: &str, count: usize) {
        if count > 0 {
            self.flag_lookups_total
                .with_label_values(&[result])
                .inc_by(count as f64);
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (
            status = 200,
            description = "Prometheus metrics in text format",
            content_type = "text/plain"
        ),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Register on first scrape so the families exist even before any traffic.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_sync_gauges() -> Result<(), String> {
        let metrics = metrics().ok_or("Metrics init failed")?;
        metrics.sync_started(60);
        metrics.record_sync_batch(true, 25);
        assert_eq!(metrics.sync_records_total.get(), 60.0);
        assert!(metrics.sync_records_synced.get() >= 0.0);
        Ok(())
    }

    #[test]
    fn test_admission_counter() -> Result<(), String> {
        let metrics = metrics().ok_or("Metrics init failed")?;
        let before = metrics
            .queue_admissions_total
            .with_label_values(&["inserted"])
            .get();
        metrics.record_admission("inserted");
        let after = metrics
            .queue_admissions_total
            .with_label_values(&["inserted"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }
}
