//! Flag Lookup Service
//!
//! Composite read view over the live flag table and resolved-positive queue
//! entries.

use roscoe_core::{FlagType, FlagView, LookupError, StoreError, UserId, MAX_STORABLE_USER_ID};
use roscoe_storage::schema::placeholders;
use roscoe_storage::{row_f32, row_opt_string, row_u64, RemoteExecutor, Row, SqlParam};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::telemetry::metrics;

/// Bound parameters per lookup query (the remote statement limit).
const MAX_IDS_PER_QUERY: usize = 100;

/// Resolves user ids to their [`FlagView`].
#[derive(Clone)]
pub struct FlagService {
    executor: Arc<dyn RemoteExecutor>,
}

impl FlagService {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Resolve every id in `ids`.
    ///
    /// Live rows win over the queue sentinel; ids found in neither map to
    /// [`FlagView::None`]. Any zero id rejects the whole request. Ids above
    /// [`MAX_STORABLE_USER_ID`] can never be stored and resolve to
    /// [`FlagView::None`] without a query.
    pub async fn resolve(&self, ids: &[UserId]) -> Result<HashMap<UserId, FlagView>, LookupError> {
        if ids.contains(&0) {
            return Err(LookupError::InvalidId);
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<UserId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let storable: Vec<UserId> = unique
            .iter()
            .copied()
            .filter(|id| *id <= MAX_STORABLE_USER_ID)
            .collect();

        let mut views = self.fetch_live(&storable).await?;
        let live_count = views.len();

        let pending: Vec<UserId> = storable
            .iter()
            .copied()
            .filter(|id| !views.contains_key(id))
            .collect();
        let queued = self.fetch_queued_positive(&pending).await?;
        let queued_count = queued.len();
        for id in queued {
            views.insert(id, FlagView::QueuedPositive);
        }

        for id in &unique {
            views.entry(*id).or_insert(FlagView::None);
        }

        if let Some(metrics) = metrics() {
            metrics.record_lookup("live", live_count);
            metrics.record_lookup("queued", queued_count);
            metrics.record_lookup("none", unique.len() - live_count - queued_count);
        }
        tracing::debug!(
            requested = unique.len(),
            live = live_count,
            queued = queued_count,
            "Resolved flags"
        );

        Ok(views)
    }

    /// Resolve a single id.
    pub async fn resolve_one(&self, id: UserId) -> Result<FlagView, LookupError> {
        let mut views = self.resolve(&[id]).await?;
        Ok(views.remove(&id).unwrap_or(FlagView::None))
    }

    async fn fetch_live(&self, ids: &[UserId]) -> Result<HashMap<UserId, FlagView>, StoreError> {
        let mut views = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT user_id, flag_type, confidence, reasons FROM user_flags \
                 WHERE user_id IN ({})",
                placeholders(chunk.len())
            );
            let rows = self.executor.execute(&sql, &id_params(chunk)).await?;
            for row in &rows {
                let (id, view) = decode_live(row)?;
                views.insert(id, view);
            }
        }
        Ok(views)
    }

    async fn fetch_queued_positive(&self, ids: &[UserId]) -> Result<Vec<UserId>, StoreError> {
        let mut found = Vec::new();
        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT user_id FROM queued_users \
                 WHERE user_id IN ({}) AND processed = 1 AND flagged = 1",
                placeholders(chunk.len())
            );
            let rows = self.executor.execute(&sql, &id_params(chunk)).await?;
            for row in &rows {
                found.push(row_u64(row, "user_id")?);
            }
        }
        Ok(found)
    }
}

fn id_params(ids: &[UserId]) -> Vec<SqlParam> {
    ids.iter().map(|id| SqlParam::from(*id)).collect()
}

fn decode_live(row: &Row) -> Result<(UserId, FlagView), StoreError> {
    let user_id = row_u64(row, "user_id")?;
    let code = row_u64(row, "flag_type")?;
    let flag_type = u8::try_from(code)
        .ok()
        .and_then(FlagType::from_u8)
        .ok_or_else(|| StoreError::Column {
            column: "flag_type".to_string(),
            reason: format!("unknown flag type {}", code),
        })?;

    Ok((
        user_id,
        FlagView::Live {
            flag_type,
            confidence: row_f32(row, "confidence")?,
            reasons: row_opt_string(row, "reasons")?,
        },
    ))
}
