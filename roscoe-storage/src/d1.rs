//! Cloudflare D1 HTTP client.

use crate::executor::{RemoteExecutor, Row, SqlParam};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roscoe_core::{ConfigError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Connection settings for one D1 database.
#[derive(Clone)]
pub struct D1Config {
    pub account_id: String,
    pub database_id: String,
    pub api_token: String,
    /// API root, overridable for tests.
    pub api_base: String,
    pub timeout: Duration,
}

impl fmt::Debug for D1Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D1Config")
            .field("account_id", &self.account_id)
            .field("database_id", &self.database_id)
            .field("api_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl D1Config {
    pub fn new(
        account_id: impl Into<String>,
        database_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            database_id: database_id.into(),
            api_token: api_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Load from environment variables.
    ///
    /// - `ROSCOE_CF_ACCOUNT_ID`, `ROSCOE_CF_D1_ID`, `ROSCOE_CF_API_TOKEN` (required)
    /// - `ROSCOE_CF_API_BASE` (default: the public Cloudflare API)
    /// - `ROSCOE_CF_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    var: var.to_string(),
                })
        };

        let mut config = Self::new(
            required("ROSCOE_CF_ACCOUNT_ID")?,
            required("ROSCOE_CF_D1_ID")?,
            required("ROSCOE_CF_API_TOKEN")?,
        );
        if let Ok(base) = std::env::var("ROSCOE_CF_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = std::env::var("ROSCOE_CF_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn query_url(&self) -> String {
        format!(
            "{}/accounts/{}/d1/database/{}/query",
            self.api_base, self.account_id, self.database_id
        )
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
    params: &'a [SqlParam],
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ResponseMessage>,
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    results: Vec<Row>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// D1 query client.
#[derive(Clone)]
pub struct D1Client {
    client: Client,
    url: String,
    token: String,
}

impl fmt::Debug for D1Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D1Client").field("url", &self.url).finish()
    }
}

impl D1Client {
    pub fn new(config: &D1Config) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport {
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: config.query_url(),
            token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl RemoteExecutor for D1Client {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&QueryRequest { sql, params })
            .send()
            .await
            .map_err(|e| StoreError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "D1 query rejected");
            return Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: QueryResponse = response.json().await.map_err(|e| StoreError::Decode {
            reason: e.to_string(),
        })?;

        if !decoded.success {
            let messages = decoded
                .errors
                .iter()
                .map(|m| m.message.as_str())
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StoreError::Unsuccessful { messages });
        }

        Ok(decoded
            .result
            .into_iter()
            .next()
            .map(|r| r.results)
            .unwrap_or_default())
    }
}
