//! Sync Service
//!
//! Replicates the primary store's flag dataset into the remote store:
//!
//! 1. ensure the long-lived tables exist and recreate the staging table
//! 2. fetch every record from the [`SourceReader`]
//! 3. write fixed-size batches into staging with a bounded worker pool
//! 4. swap staging in as the live table with one rename batch
//!
//! The swap only runs after every batch succeeded, so readers never see a
//! partially written generation.

use roscoe_core::{
    collapse_duplicates, ConfigError, FlagRecord, StoreError, SyncConfig, SyncError,
};
use roscoe_storage::schema::{staging_insert, ENSURE_TABLES, RESET_STAGING, SWAP_TABLES};
use roscoe_storage::{RemoteExecutor, SourceReader, SqlParam};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::telemetry::metrics;

// ============================================================================
// PROGRESS
// ============================================================================

/// Shared progress of one sync run. Counters only ever increase.
#[derive(Debug, Default)]
pub struct SyncProgress {
    total: usize,
    synced: AtomicUsize,
    batches: AtomicUsize,
}

impl SyncProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            synced: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Records written to staging so far.
    pub fn synced(&self) -> usize {
        self.synced.load(Ordering::Acquire)
    }

    /// Batches completed so far.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::Acquire)
    }

    /// Count a completed batch of `rows` records; returns the new synced total.
    pub fn record_batch(&self, rows: usize) -> usize {
        self.batches.fetch_add(1, Ordering::AcqRel);
        self.synced.fetch_add(rows, Ordering::AcqRel) + rows
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.synced() as f64 * 100.0 / self.total as f64
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Records written to the live table.
    pub records: usize,
    /// Source rows dropped because their user id appeared twice.
    pub duplicates: usize,
    pub batches: usize,
    /// False when the source was empty and the live table was left alone.
    pub swapped: bool,
    pub elapsed: Duration,
}

// ============================================================================
// SERVICE
// ============================================================================

struct BatchJob {
    index: usize,
    records: Vec<FlagRecord>,
}

/// Sync orchestrator and table swapper.
#[derive(Clone)]
pub struct SyncService {
    executor: Arc<dyn RemoteExecutor>,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(executor: Arc<dyn RemoteExecutor>, config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { executor, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Create missing tables and recreate an empty staging table.
    pub async fn prepare(&self) -> Result<(), SyncError> {
        self.executor
            .execute(ENSURE_TABLES, &[])
            .await
            .map_err(SyncError::Prepare)?;
        self.executor
            .execute(RESET_STAGING, &[])
            .await
            .map_err(SyncError::Prepare)?;
        Ok(())
    }

    /// Write `records` into the staging table.
    ///
    /// Batches are handed to `max_concurrent` workers over a shared channel.
    /// After the first failure no new batch is started, batches already in
    /// flight finish, and that first failure is returned once every worker
    /// has exited. Cancellation abandons in-flight calls.
    pub async fn sync(
        &self,
        records: Vec<FlagRecord>,
        progress: Arc<SyncProgress>,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if records.is_empty() {
            return Ok(());
        }

        let batch_count = self.config.batch_count(records.len());
        let (tx, rx) = async_channel::bounded::<BatchJob>(batch_count);
        let mut remaining = records.into_iter();
        for index in 0..batch_count {
            let batch: Vec<FlagRecord> = remaining.by_ref().take(self.config.batch_size).collect();
            tx.try_send(BatchJob {
                index,
                records: batch,
            })
            .map_err(|e| SyncError::Worker {
                reason: format!("Failed to queue batch {}: {}", index, e),
            })?;
        }
        tx.close();

        let failed = Arc::new(AtomicBool::new(false));
        let first_error: Arc<OnceLock<SyncError>> = Arc::new(OnceLock::new());
        let workers = self.config.max_concurrent.min(batch_count);

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let rx = rx.clone();
            let executor = Arc::clone(&self.executor);
            let progress = Arc::clone(&progress);
            let failed = Arc::clone(&failed);
            let first_error = Arc::clone(&first_error);
            let cancel = cancel.clone();
            let rows_per_statement = self.config.rows_per_statement;

            set.spawn(async move {
                loop {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }

                    let job = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        job = rx.recv() => match job {
                            Ok(job) => job,
                            Err(_) => break,
                        },
                    };

                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = write_batch(
                            executor.as_ref(),
                            &job.records,
                            rows_per_statement,
                        ) => result,
                    };

                    match result {
                        Ok(()) => {
                            let synced = progress.record_batch(job.records.len());
                            if let Some(metrics) = metrics() {
                                metrics.record_sync_batch(true, synced);
                            }
                            tracing::info!(
                                worker,
                                batch = job.index,
                                synced,
                                total = progress.total(),
                                percent = progress.percent(),
                                "Batch synced"
                            );
                        }
                        Err(source) => {
                            failed.store(true, Ordering::Release);
                            if let Some(metrics) = metrics() {
                                metrics.record_sync_batch(false, 0);
                            }
                            tracing::error!(
                                worker,
                                batch = job.index,
                                error = %source,
                                "Batch failed"
                            );
                            let _ = first_error.set(SyncError::Batch {
                                index: job.index,
                                source,
                            });
                            break;
                        }
                    }
                }
            });
        }
        drop(rx);

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                failed.store(true, Ordering::Release);
                let _ = first_error.set(SyncError::Worker {
                    reason: e.to_string(),
                });
            }
        }

        if let Some(err) = first_error.get() {
            return Err(err.clone());
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Replace the live table with staging in one remote statement batch.
    pub async fn swap(&self) -> Result<(), SyncError> {
        self.executor
            .execute(SWAP_TABLES, &[])
            .await
            .map_err(SyncError::Swap)?;
        tracing::info!("Swapped staging table into place");
        Ok(())
    }

    /// Full pipeline: prepare, fetch, sync, swap.
    ///
    /// An empty source leaves the live table untouched.
    pub async fn run(
        &self,
        source: &dyn SourceReader,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.prepare().await?;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            fetched = source.fetch_all() => fetched?,
        };

        let (records, duplicates) = collapse_duplicates(fetched);
        if duplicates > 0 {
            tracing::warn!(
                duplicates,
                "Collapsed duplicate user ids, confirmed wins over flagged"
            );
        }

        if records.is_empty() {
            tracing::info!("No flags to sync");
            return Ok(SyncReport {
                records: 0,
                duplicates,
                batches: 0,
                swapped: false,
                elapsed: started.elapsed(),
            });
        }

        let total = records.len();
        let batches = self.config.batch_count(total);
        if let Some(metrics) = metrics() {
            metrics.sync_started(total);
        }
        tracing::info!(
            total,
            batches,
            max_concurrent = self.config.max_concurrent,
            "Starting sync"
        );

        let progress = Arc::new(SyncProgress::new(total));
        self.sync(records, Arc::clone(&progress), cancel).await?;
        self.swap().await?;

        let elapsed = started.elapsed();
        tracing::info!(
            records = progress.synced(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Sync completed"
        );

        Ok(SyncReport {
            records: progress.synced(),
            duplicates,
            batches: progress.batches(),
            swapped: true,
            elapsed,
        })
    }
}

/// Insert one batch as sequential multi-row statements.
async fn write_batch(
    executor: &dyn RemoteExecutor,
    records: &[FlagRecord],
    rows_per_statement: usize,
) -> Result<(), StoreError> {
    for chunk in records.chunks(rows_per_statement) {
        let sql = staging_insert(chunk.len());
        let mut params: Vec<SqlParam> = Vec::with_capacity(chunk.len() * 4);
        for record in chunk {
            params.push(SqlParam::from(record.user_id));
            params.push(SqlParam::from(record.flag_type.as_u8()));
            params.push(SqlParam::from(record.confidence));
            params.push(SqlParam::from(record.reasons.clone()));
        }
        executor.execute(&sql, &params).await?;
    }
    Ok(())
}
