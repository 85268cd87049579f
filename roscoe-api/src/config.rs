//! API Configuration Module
//!
//! Server settings loaded from environment variables with development
//! defaults.

use roscoe_core::{ConfigError, LookupConfig, StoreError};
use roscoe_storage::{D1Client, D1Config, RemoteExecutor, SqliteExecutor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// Listening port.
    pub port: u16,

    /// Batch lookup limits.
    pub lookup: LookupConfig,

    /// Whether the functional routes require an `X-Auth-Token`.
    pub require_auth: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            lookup: LookupConfig::default(),
            require_auth: true,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ROSCOE_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `ROSCOE_API_PORT`: Listening port (default: 3000)
    /// - `ROSCOE_LOOKUP_BATCH_LIMIT`: Max ids per batch lookup (default: 100)
    /// - `ROSCOE_REQUIRE_AUTH`: "false" disables token checks (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_host =
            std::env::var("ROSCOE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("ROSCOE_API_PORT").ok())
        {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "port".to_string(),
                value: raw.clone(),
                reason: "not a valid port".to_string(),
            })?,
            None => 3000,
        };

        let require_auth = std::env::var("ROSCOE_REQUIRE_AUTH")
            .ok()
            .map(|s| parse_require_auth(&s))
            .unwrap_or(true);

        Ok(Self {
            bind_host,
            port,
            lookup: LookupConfig::from_env()?,
            require_auth,
        })
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse().map_err(|e| ConfigError::InvalidValue {
            field: "bind address".to_string(),
            value: addr.clone(),
            reason: format!("{}", e),
        })
    }
}

// ============================================================================
// REMOTE STORE SELECTION
// ============================================================================

/// Which remote store backs the services.
#[derive(Debug, Clone)]
pub enum StoreTarget {
    /// Embedded SQLite database file, for local development.
    Sqlite(PathBuf),
    /// Cloudflare D1 over its HTTP API.
    D1(D1Config),
}

impl StoreTarget {
    /// Resolve the store: an explicit SQLite path wins, then
    /// `ROSCOE_SQLITE_PATH`, then the `ROSCOE_CF_*` variables.
    pub fn from_env(sqlite: Option<PathBuf>) -> Result<Self, ConfigError> {
        let sqlite = sqlite.or_else(|| std::env::var("ROSCOE_SQLITE_PATH").ok().map(PathBuf::from));
        match sqlite {
            Some(path) => Ok(StoreTarget::Sqlite(path)),
            None => Ok(StoreTarget::D1(D1Config::from_env()?)),
        }
    }

    pub fn connect(&self) -> Result<Arc<dyn RemoteExecutor>, StoreError> {
        match self {
            StoreTarget::Sqlite(path) => {
                tracing::info!(path = %path.display(), "Using SQLite store");
                Ok(Arc::new(SqliteExecutor::open(path)?))
            }
            StoreTarget::D1(config) => {
                tracing::info!(database_id = %config.database_id, "Using D1 store");
                Ok(Arc::new(D1Client::new(config)?))
            }
        }
    }
}

/// Only an explicit "false" turns auth off.
fn parse_require_auth(value: &str) -> bool {
    !value.trim().eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.lookup.batch_limit, 100);
        assert!(config.require_auth);
    }

    #[test]
    fn test_require_auth_parsing() {
        assert!(!parse_require_auth("false"));
        assert!(!parse_require_auth("FALSE "));
        assert!(parse_require_auth("true"));
        assert!(parse_require_auth("0"));
        assert!(parse_require_auth(""));
    }

    #[test]
    fn test_explicit_sqlite_path_wins() -> Result<(), ConfigError> {
        let target = StoreTarget::from_env(Some(PathBuf::from("/tmp/roscoe.db")))?;
        assert!(matches!(
            target,
            StoreTarget::Sqlite(path) if path == PathBuf::from("/tmp/roscoe.db")
        ));
        Ok(())
    }

    #[test]
    fn test_bind_addr() -> Result<(), ConfigError> {
        let config = ApiConfig {
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
            ..ApiConfig::default()
        };
        assert_eq!(config.bind_addr()?.port(), 8080);

        let bad = ApiConfig {
            bind_host: "not a host".to_string(),
            ..ApiConfig::default()
        };
        assert!(bad.bind_addr().is_err());
        Ok(())
    }
}
