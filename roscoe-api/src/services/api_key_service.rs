//! API Key Registry Service

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::RngCore;
use roscoe_core::{ApiKeyRecord, KeyError, StoreError};
use roscoe_storage::{row_i64, row_opt_string, row_string, RemoteExecutor, Row, SqlParam};
use std::sync::Arc;

/// Random bytes per generated key.
const KEY_BYTES: usize = 32;

/// Generate a fresh key: 32 random bytes, URL-safe base64 without padding.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// CRUD over the `api_keys` table.
#[derive(Clone)]
pub struct ApiKeyService {
    executor: Arc<dyn RemoteExecutor>,
}

impl ApiKeyService {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Register a newly generated key and return it.
    pub async fn add(&self, description: &str) -> Result<String, KeyError> {
        let key = generate_key();
        self.add_with_key(&key, description).await?;
        tracing::info!(description, "API key added");
        Ok(key)
    }

    /// Register a caller-chosen key.
    pub async fn add_with_key(&self, key: &str, description: &str) -> Result<(), KeyError> {
        self.executor
            .execute(
                "INSERT INTO api_keys (key, description, created_at) VALUES (?, ?, ?)",
                &[
                    SqlParam::from(key),
                    SqlParam::from(description),
                    SqlParam::from(Utc::now().timestamp()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Delete `key`; [`KeyError::NotFound`] when no row was removed.
    pub async fn remove(&self, key: &str) -> Result<(), KeyError> {
        let rows = self
            .executor
            .execute(
                "DELETE FROM api_keys WHERE key = ? RETURNING key",
                &[SqlParam::from(key)],
            )
            .await?;

        if rows.is_empty() {
            return Err(KeyError::NotFound);
        }
        tracing::info!("API key removed");
        Ok(())
    }

    /// Whether `key` is registered.
    pub async fn validate(&self, key: &str) -> Result<bool, KeyError> {
        if key.is_empty() {
            return Ok(false);
        }

        let rows = self
            .executor
            .execute(
                "SELECT 1 AS found FROM api_keys WHERE key = ? LIMIT 1",
                &[SqlParam::from(key)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// All keys, newest first.
    pub async fn list(&self) -> Result<Vec<ApiKeyRecord>, KeyError> {
        let rows = self
            .executor
            .execute(
                "SELECT key, description, created_at FROM api_keys \
                 ORDER BY created_at DESC, rowid DESC",
                &[],
            )
            .await?;

        rows.iter()
            .map(decode_key)
            .collect::<Result<Vec<_>, _>>()
            .map_err(KeyError::from)
    }
}

fn decode_key(row: &Row) -> Result<ApiKeyRecord, StoreError> {
    Ok(ApiKeyRecord {
        key: row_string(row, "key")?,
        description: row_opt_string(row, "description")?.unwrap_or_default(),
        created_at: row_i64(row, "created_at")?,
    })
}
