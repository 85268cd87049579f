//! Primary store reader.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use roscoe_core::{FlagRecord, FlagType, SourceError};
use tokio_postgres::NoTls;

/// Pulls the complete flag dataset from the primary store.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<FlagRecord>, SourceError>;
}

/// Union of both primary relations, each tagged with its flag type.
///
/// Columns are cast so the row decoding below does not depend on the exact
/// numeric types of the source tables.
const FETCH_ALL_FLAGS: &str = "
SELECT id::BIGINT AS id, 1::INTEGER AS flag_type,
       confidence::REAL AS confidence, reasons::TEXT AS reasons
FROM flagged_users
UNION ALL
SELECT id::BIGINT AS id, 2::INTEGER AS flag_type,
       confidence::REAL AS confidence, reasons::TEXT AS reasons
FROM confirmed_users
";

fn unavailable(err: impl std::fmt::Display) -> SourceError {
    SourceError::Unavailable {
        reason: err.to_string(),
    }
}

/// PostgreSQL-backed [`SourceReader`].
#[derive(Clone)]
pub struct PostgresSource {
    pool: Pool,
}

impl std::fmt::Debug for PostgresSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresSource")
            .field("pool_size", &status.size)
            .field("pool_max_size", &status.max_size)
            .finish()
    }
}

impl PostgresSource {
    /// Maximum pooled connections. A sync run issues a single query.
    const POOL_SIZE: usize = 4;

    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from a `postgres://` connection string.
    ///
    /// No connection is opened until the first query.
    pub fn from_url(url: &str) -> Result<Self, SourceError> {
        let pg_config: tokio_postgres::Config = url.parse().map_err(unavailable)?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(Self::POOL_SIZE)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| unavailable(format!("Failed to create pool: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Connectivity check, run before a sync touches the remote store.
    pub async fn ping(&self) -> Result<(), SourceError> {
        let client = self.pool.get().await.map_err(unavailable)?;
        client.simple_query("SELECT 1").await.map_err(unavailable)?;
        Ok(())
    }
}

fn decode_row(row: &tokio_postgres::Row) -> Result<FlagRecord, SourceError> {
    let id: i64 = row.try_get("id").map_err(unavailable)?;
    let flag_code: i32 = row.try_get("flag_type").map_err(unavailable)?;
    let confidence: Option<f32> = row.try_get("confidence").map_err(unavailable)?;
    let reasons: Option<String> = row.try_get("reasons").map_err(unavailable)?;

    let user_id = u64::try_from(id)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| SourceError::InvalidRow {
            user_id: id,
            reason: "id must be greater than 0".to_string(),
        })?;
    let flag_type = u8::try_from(flag_code)
        .ok()
        .and_then(FlagType::from_u8)
        .ok_or_else(|| SourceError::InvalidRow {
            user_id: id,
            reason: format!("unknown flag type {}", flag_code),
        })?;

    Ok(FlagRecord {
        user_id,
        flag_type,
        confidence: confidence.unwrap_or_default(),
        reasons,
    })
}

#[async_trait]
impl SourceReader for PostgresSource {
    async fn fetch_all(&self) -> Result<Vec<FlagRecord>, SourceError> {
        let client = self.pool.get().await.map_err(unavailable)?;
        let rows = client.query(FETCH_ALL_FLAGS, &[]).await.map_err(|e| {
            tracing::error!(error = %e, "Error querying flagged users");
            unavailable(e)
        })?;

        let records = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        tracing::info!(count = records.len(), "Fetched flags from primary store");
        Ok(records)
    }
}
