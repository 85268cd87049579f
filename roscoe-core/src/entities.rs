//! Entity types for flags, queue entries and API keys

use crate::enums::{FlagType, NO_FLAG, QUEUED_POSITIVE};
use crate::{UnixSeconds, UserId};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

// ============================================================================
// FLAG RECORDS
// ============================================================================

/// A flag as read from the primary store, ready to be replicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub user_id: UserId,
    pub flag_type: FlagType,
    pub confidence: f32,
    /// Structured reasons as JSON text, see [`Reasons`].
    pub reasons: Option<String>,
}

impl FlagRecord {
    pub fn new(user_id: UserId, flag_type: FlagType, confidence: f32) -> Self {
        Self {
            user_id,
            flag_type,
            confidence,
            reasons: None,
        }
    }

    pub fn with_reasons(mut self, reasons: impl Into<String>) -> Self {
        self.reasons = Some(reasons.into());
        self
    }
}

/// Collapse records sharing a user id.
///
/// Confirmed wins over Flagged; among equal flag types the earliest record
/// wins. Input order of the surviving records is preserved. Returns the
/// collapsed records and the number of rows dropped.
pub fn collapse_duplicates(records: Vec<FlagRecord>) -> (Vec<FlagRecord>, usize) {
    let input_len = records.len();
    let mut positions: HashMap<UserId, usize> = HashMap::with_capacity(input_len);
    let mut kept: Vec<FlagRecord> = Vec::with_capacity(input_len);

    for record in records {
        match positions.get(&record.user_id) {
            Some(&idx) => {
                if record.flag_type > kept[idx].flag_type {
                    kept[idx] = record;
                }
            }
            None => {
                positions.insert(record.user_id, kept.len());
                kept.push(record);
            }
        }
    }

    let dropped = input_len - kept.len();
    (kept, dropped)
}

/// One structured reason attached to a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Reason {
    pub message: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Reasons keyed by category, the shape stored in the `reasons` column.
pub type Reasons = BTreeMap<String, Reason>;

/// Parse the stored `reasons` text. Blank text yields `None`.
pub fn parse_reasons(text: &str) -> Result<Option<Reasons>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some)
}

// ============================================================================
// FLAG VIEW
// ============================================================================

/// Composite lookup result for one user id.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagView {
    /// Neither a live flag nor a resolved positive queue entry.
    None,
    /// Present in the live table.
    Live {
        flag_type: FlagType,
        confidence: f32,
        reasons: Option<String>,
    },
    /// Processed positive in the queue, not yet replicated to the live table.
    QueuedPositive,
}

impl FlagView {
    /// The numeric `flagType` reported to callers (0, 1, 2 or 3).
    pub fn flag_code(&self) -> u8 {
        match self {
            FlagView::None => NO_FLAG,
            FlagView::Live { flag_type, .. } => flag_type.as_u8(),
            FlagView::QueuedPositive => QUEUED_POSITIVE,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            FlagView::Live { confidence, .. } => Some(*confidence),
            _ => None,
        }
    }

    pub fn reasons(&self) -> Option<&str> {
        match self {
            FlagView::Live { reasons, .. } => reasons.as_deref(),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FlagView::None)
    }
}

impl From<FlagRecord> for FlagView {
    fn from(record: FlagRecord) -> Self {
        FlagView::Live {
            flag_type: record.flag_type,
            confidence: record.confidence,
            reasons: record.reasons,
        }
    }
}

// ============================================================================
// QUEUE ENTRIES
// ============================================================================

/// Row of the `queued_users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub queued_at: UnixSeconds,
    pub processed: bool,
    pub processing: bool,
    pub flagged: bool,
}

impl QueueEntry {
    /// A freshly admitted entry.
    pub fn admitted(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            queued_at: now.timestamp(),
            processed: false,
            processing: false,
            flagged: false,
        }
    }

    /// Whether the entry was queued strictly inside `window` before `now`.
    pub fn is_recent(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let cutoff = now.timestamp().saturating_sub(window.as_secs() as i64);
        self.queued_at > cutoff
    }

    pub fn queued_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.queued_at, 0).single()
    }
}

// ============================================================================
// API KEYS
// ============================================================================

/// Row of the `api_keys` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub description: String,
    pub created_at: UnixSeconds,
}

impl ApiKeyRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at, 0).single()
    }
}
