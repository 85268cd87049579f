//! Roscoe Test Utilities
//!
//! Shared test infrastructure for the Roscoe workspace:
//! - Test doubles for the source reader and remote executor seams
//! - Proptest generators for flag records
//! - Fixtures that seed an in-memory store

pub use roscoe_core::{FlagRecord, FlagType, SourceError, StoreError, UserId};
pub use roscoe_storage::{RemoteExecutor, Row, SqlParam, SqliteExecutor};

use async_trait::async_trait;
use roscoe_storage::schema::{ENSURE_TABLES, STAGING_TABLE};
use roscoe_storage::SourceReader;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory SQLite store with every long-lived table created.
pub async fn memory_store() -> Result<Arc<SqliteExecutor>, StoreError> {
    let store = Arc::new(SqliteExecutor::open_in_memory()?);
    store.execute(ENSURE_TABLES, &[]).await?;
    Ok(store)
}

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Source reader returning a fixed record set, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticSource {
    result: Result<Vec<FlagRecord>, SourceError>,
}

impl StaticSource {
    pub fn new(records: Vec<FlagRecord>) -> Self {
        Self {
            result: Ok(records),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            result: Err(SourceError::Unavailable {
                reason: reason.into(),
            }),
        }
    }
}

#[async_trait]
impl SourceReader for StaticSource {
    async fn fetch_all(&self) -> Result<Vec<FlagRecord>, SourceError> {
        self.result.clone()
    }
}

fn is_staging_insert(sql: &str) -> bool {
    sql.trim_start()
        .starts_with(&format!("INSERT INTO {}", STAGING_TABLE))
}

/// What a [`FaultyExecutor`] refuses to run.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Any staging insert carrying this user id.
    StagingRow(UserId),
    /// Any statement batch containing this text.
    Statement(&'static str),
}

/// Executor that delegates to an inner store but fails on a chosen statement.
pub struct FaultyExecutor {
    inner: Arc<dyn RemoteExecutor>,
    fault: Fault,
    failures: AtomicUsize,
}

impl FaultyExecutor {
    pub fn new(inner: Arc<dyn RemoteExecutor>, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            failures: AtomicUsize::new(0),
        }
    }

    /// Number of calls that were failed.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn should_fail(&self, sql: &str, params: &[SqlParam]) -> bool {
        match &self.fault {
            Fault::StagingRow(user_id) => {
                is_staging_insert(sql)
                    && params
                        .iter()
                        .step_by(4)
                        .any(|p| p.as_u64() == Some(*user_id))
            }
            Fault::Statement(text) => sql.contains(text),
        }
    }
}

#[async_trait]
impl RemoteExecutor for FaultyExecutor {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, StoreError> {
        if self.should_fail(sql, params) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::UnexpectedStatus {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        self.inner.execute(sql, params).await
    }
}

/// Executor that delays staging inserts and records how many overlap.
pub struct CountingExecutor {
    inner: Arc<dyn RemoteExecutor>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    staging_calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn new(inner: Arc<dyn RemoteExecutor>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            staging_calls: AtomicUsize::new(0),
        }
    }

    /// Highest number of staging inserts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn staging_calls(&self) -> usize {
        self.staging_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExecutor for CountingExecutor {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, StoreError> {
        if !is_staging_insert(sql) {
            return self.inner.execute(sql, params).await;
        }

        self.staging_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        let result = self.inner.execute(sql, params).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Roscoe domain types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid (non-zero) user id.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        1..=i64::MAX as u64
    }

    pub fn arb_flag_type() -> impl Strategy<Value = FlagType> {
        prop_oneof![Just(FlagType::Flagged), Just(FlagType::Confirmed)]
    }

    /// Generate reasons JSON text with one category.
    pub fn arb_reasons() -> impl Strategy<Value = String> {
        ("[a-z_]{1,12}", "[a-zA-Z ]{0,40}", 0.0f64..=1.0).prop_map(
            |(category, message, confidence)| {
                let mut reasons = serde_json::Map::new();
                reasons.insert(
                    category,
                    serde_json::json!({
                        "message": message,
                        "confidence": confidence,
                        "evidence": []
                    }),
                );
                serde_json::Value::Object(reasons).to_string()
            },
        )
    }

    pub fn arb_flag_record() -> impl Strategy<Value = FlagRecord> {
        (
            arb_user_id(),
            arb_flag_type(),
            0.0f32..=1.0,
            prop::option::of(arb_reasons()),
        )
            .prop_map(|(user_id, flag_type, confidence, reasons)| FlagRecord {
                user_id,
                flag_type,
                confidence,
                reasons,
            })
    }

    /// Generate records with pairwise distinct user ids.
    pub fn arb_unique_records(max: usize) -> impl Strategy<Value = Vec<FlagRecord>> {
        prop::collection::btree_map(
            arb_user_id(),
            (arb_flag_type(), 0.0f32..=1.0),
            0..max,
        )
        .prop_map(|by_id| {
            by_id
                .into_iter()
                .map(|(user_id, (flag_type, confidence))| {
                    FlagRecord::new(user_id, flag_type, confidence)
                })
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and store seeding helpers.

    use super::*;
    use roscoe_storage::{row_u64, schema::LIVE_TABLE};

    /// Reasons text in the stored shape.
    pub const SAMPLE_REASONS: &str =
        r#"{"profile":{"message":"Suspicious description","confidence":0.8,"evidence":["bio"]}}"#;

    pub fn flagged(user_id: UserId) -> FlagRecord {
        FlagRecord::new(user_id, FlagType::Flagged, 0.5)
    }

    pub fn confirmed(user_id: UserId) -> FlagRecord {
        FlagRecord::new(user_id, FlagType::Confirmed, 0.9).with_reasons(SAMPLE_REASONS)
    }

    /// `count` records with ids `1..=count`, alternating flagged and confirmed.
    pub fn records(count: u64) -> Vec<FlagRecord> {
        (1..=count)
            .map(|id| if id % 2 == 0 { confirmed(id) } else { flagged(id) })
            .collect()
    }

    /// Write a record straight into the live table.
    pub async fn insert_live(
        store: &dyn RemoteExecutor,
        record: &FlagRecord,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (user_id, flag_type, confidence, reasons) VALUES (?, ?, ?, ?)",
            LIVE_TABLE
        );
        store
            .execute(
                &sql,
                &[
                    SqlParam::from(record.user_id),
                    SqlParam::from(record.flag_type.as_u8()),
                    SqlParam::from(record.confidence),
                    SqlParam::from(record.reasons.clone()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Write a queue row with explicit state.
    pub async fn insert_queued(
        store: &dyn RemoteExecutor,
        user_id: UserId,
        queued_at: i64,
        processed: bool,
        processing: bool,
        flagged: bool,
    ) -> Result<(), StoreError> {
        store
            .execute(
                "INSERT INTO queued_users (user_id, queued_at, processed, processing, flagged)
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    SqlParam::from(user_id),
                    SqlParam::from(queued_at),
                    SqlParam::from(processed as i64),
                    SqlParam::from(processing as i64),
                    SqlParam::from(flagged as i64),
                ],
            )
            .await?;
        Ok(())
    }

    /// Sorted user ids currently in the live table.
    pub async fn live_user_ids(store: &dyn RemoteExecutor) -> Result<Vec<UserId>, StoreError> {
        let sql = format!("SELECT user_id FROM {} ORDER BY user_id", LIVE_TABLE);
        store
            .execute(&sql, &[])
            .await?
            .iter()
            .map(|row| row_u64(row, "user_id"))
            .collect()
    }

    /// Row count of `table`.
    pub async fn count_rows(store: &dyn RemoteExecutor, table: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", table);
        let rows = store.execute(&sql, &[]).await?;
        match rows.first() {
            Some(row) => row_u64(row, "n"),
            None => Ok(0),
        }
    }

    /// Whether `table` exists in the store.
    pub async fn table_exists(store: &dyn RemoteExecutor, table: &str) -> Result<bool, StoreError> {
        let rows = store
            .execute(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[SqlParam::from(table)],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}
