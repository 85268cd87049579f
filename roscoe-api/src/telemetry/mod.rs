//! Roscoe Telemetry - Observability Infrastructure
//!
//! Provides tracing subscriber setup and Prometheus metrics for the service.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics, metrics_handler, RoscoeMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, LogFormat, LogTarget, TelemetryConfig, DEFAULT_LOG_FILTER};
