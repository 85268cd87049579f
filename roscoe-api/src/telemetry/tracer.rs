//! Tracing Subscriber Initialization
//!
//! Installs the global `tracing` subscriber for both binaries:
//! - `EnvFilter` from `RUST_LOG`, falling back to a per-crate default
//! - human-readable or JSON output selected by `ROSCOE_LOG_FORMAT`
//! - stdout for the server, stderr for the CLI so command output stays clean

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "roscoe_api=debug,roscoe_storage=info,tower_http=info,info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Stream formatted events are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Output format
    pub log_format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
    pub target: LogTarget,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "roscoe-api".to_string(),
            log_format: LogFormat::Pretty,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            target: LogTarget::Stdout,
        }
    }
}

impl TelemetryConfig {
    /// Load from `ROSCOE_SERVICE_NAME` and `ROSCOE_LOG_FORMAT` (`json` or `pretty`).
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: std::env::var("ROSCOE_SERVICE_NAME")
                .unwrap_or_else(|_| service_name.to_string()),
            log_format: std::env::var("ROSCOE_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(LogFormat::Pretty),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            target: LogTarget::Stdout,
        }
    }

    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup, before any tracing occurs.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let writer = match config.target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "roscoe-api");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.default_filter.contains("roscoe_api=debug"));
        assert_eq!(config.target, LogTarget::Stdout);
    }

    #[test]
    fn test_with_target_switches_stream() {
        let config = TelemetryConfig::default().with_target(LogTarget::Stderr);
        assert_eq!(config.target, LogTarget::Stderr);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
