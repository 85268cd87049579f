//! Queue Admission Service
//!
//! Decides whether a user may enter the processing queue. A user is
//! admitted when they carry no flag and have not been queued inside the
//! retention window.

use chrono::{DateTime, Utc};
use roscoe_core::{
    QueueConfig, QueueEntry, QueueError, StoreError, UserId, MAX_STORABLE_USER_ID,
};
use roscoe_storage::{row_bool, row_i64, row_u64, RemoteExecutor, Row, SqlParam};
use std::sync::Arc;

use super::FlagService;
use crate::telemetry::metrics;

/// Result of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No prior queue entry existed (or a concurrent admission created it).
    Inserted,
    /// A stale entry was reset to unprocessed.
    Requeued,
}

impl Admission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Admission::Inserted => "inserted",
            Admission::Requeued => "requeued",
        }
    }
}

/// Queue admission controller.
#[derive(Clone)]
pub struct QueueService {
    executor: Arc<dyn RemoteExecutor>,
    flags: FlagService,
    config: QueueConfig,
}

impl QueueService {
    pub fn new(executor: Arc<dyn RemoteExecutor>, flags: FlagService, config: QueueConfig) -> Self {
        Self {
            executor,
            flags,
            config,
        }
    }

    /// Admit `user_id` at the current time.
    pub async fn admit(&self, user_id: UserId) -> Result<Admission, QueueError> {
        self.admit_at(user_id, Utc::now()).await
    }

    /// Admit `user_id` as of `now`.
    pub async fn admit_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Admission, QueueError> {
        let result = self.try_admit(user_id, now).await;

        let outcome = match &result {
            Ok(admission) => admission.as_str(),
            Err(QueueError::AlreadyFlagged { .. }) => "already_flagged",
            Err(QueueError::RecentlyQueued { .. }) => "recently_queued",
            Err(QueueError::InvalidUserId | QueueError::IdOutOfRange { .. }) => "invalid",
            Err(_) => "error",
        };
        if let Some(metrics) = metrics() {
            metrics.record_admission(outcome);
        }
        tracing::debug!(user_id, outcome, "Queue admission");

        result
    }

    async fn try_admit(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Admission, QueueError> {
        if user_id == 0 {
            return Err(QueueError::InvalidUserId);
        }
        if user_id > MAX_STORABLE_USER_ID {
            return Err(QueueError::IdOutOfRange { user_id });
        }

        let view = self.flags.resolve_one(user_id).await?;
        if !view.is_none() {
            return Err(QueueError::AlreadyFlagged { user_id });
        }

        match self.find_entry(user_id).await? {
            None => {
                self.insert_entry(user_id, now).await?;
                Ok(Admission::Inserted)
            }
            Some(entry) if entry.is_recent(now, self.config.retention_window) => {
                Err(QueueError::RecentlyQueued { user_id })
            }
            Some(_) => {
                self.requeue_entry(user_id, now).await?;
                Ok(Admission::Requeued)
            }
        }
    }

    /// Current queue entry for `user_id`, if any.
    pub async fn find_entry(&self, user_id: UserId) -> Result<Option<QueueEntry>, StoreError> {
        let rows = self
            .executor
            .execute(
                "SELECT user_id, queued_at, processed, processing, flagged \
                 FROM queued_users WHERE user_id = ?",
                &[SqlParam::from(user_id)],
            )
            .await?;

        rows.first().map(decode_entry).transpose()
    }

    async fn insert_entry(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let entry = QueueEntry::admitted(user_id, now);
        // A concurrent admission may have inserted first; its row is as fresh as ours.
        self.executor
            .execute(
                "INSERT INTO queued_users (user_id, queued_at, processed, processing, flagged) \
                 VALUES (?, ?, 0, 0, 0) ON CONFLICT(user_id) DO NOTHING",
                &[SqlParam::from(entry.user_id), SqlParam::from(entry.queued_at)],
            )
            .await?;
        Ok(())
    }

    async fn requeue_entry(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.executor
            .execute(
                "UPDATE queued_users SET queued_at = ?, processed = 0 WHERE user_id = ?",
                &[SqlParam::from(now.timestamp()), SqlParam::from(user_id)],
            )
            .await?;
        Ok(())
    }
}

fn decode_entry(row: &Row) -> Result<QueueEntry, StoreError> {
    Ok(QueueEntry {
        user_id: row_u64(row, "user_id")?,
        queued_at: row_i64(row, "queued_at")?,
        processed: row_bool(row, "processed")?,
        processing: row_bool(row, "processing")?,
        flagged: row_bool(row, "flagged")?,
    })
}
