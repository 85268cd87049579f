//! Error types for Roscoe operations

use crate::UserId;
use thiserror::Error;

/// Coarse classification every boundary (HTTP, CLI) maps to its own codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or zero ids, malformed bodies. Never retried.
    InvalidInput,
    /// Rejection by the admission rules.
    Conflict,
    /// Primary store or remote executor failure.
    UpstreamUnavailable,
    /// Target row does not exist.
    NotFound,
    /// Stopped by the operator before completing.
    Cancelled,
}

/// Remote store (executor) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Remote API returned unsuccessful response: {messages}")]
    Unsuccessful { messages: String },

    #[error("Request failed: {reason}")]
    Transport { reason: String },

    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },

    #[error("Column {column} missing or invalid: {reason}")]
    Column { column: String, reason: String },

    #[error("Unsupported statement parameter: {reason}")]
    InvalidParam { reason: String },

    #[error("SQLite error: {reason}")]
    Sqlite { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Primary store (source reader) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Invalid source row for user {user_id}: {reason}")]
    InvalidRow { user_id: i64, reason: String },
}

/// Sync pipeline errors. Every variant aborts the run before the swap.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Failed to fetch records: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to prepare tables: {0}")]
    Prepare(StoreError),

    #[error("Batch {index} failed: {source}")]
    Batch { index: usize, source: StoreError },

    #[error("Failed to swap tables: {0}")]
    Swap(StoreError),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Sync worker failed: {reason}")]
    Worker { reason: String },
}

/// Flag lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Invalid ID: must be greater than 0")]
    InvalidId,

    #[error("Error querying flags: {0}")]
    Store(#[from] StoreError),
}

/// Queue admission errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid ID: must be greater than 0")]
    InvalidUserId,

    #[error("Invalid ID: {user_id} exceeds the storable range")]
    IdOutOfRange { user_id: UserId },

    #[error("User {user_id} is already flagged or confirmed")]
    AlreadyFlagged { user_id: UserId },

    #[error("User {user_id} was queued within the retention window")]
    RecentlyQueued { user_id: UserId },

    #[error("Error checking user flags: {0}")]
    Lookup(LookupError),

    #[error("Error updating queue: {0}")]
    Store(#[from] StoreError),
}

impl From<LookupError> for QueueError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidId => QueueError::InvalidUserId,
            other => QueueError::Lookup(other),
        }
    }
}

/// API key registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key not found")]
    NotFound,

    #[error("Error accessing API keys: {0}")]
    Store(#[from] StoreError),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {var} is not set")]
    MissingRequired { var: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UpstreamUnavailable
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::UpstreamUnavailable,
        }
    }
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::InvalidId => ErrorKind::InvalidInput,
            LookupError::Store(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::InvalidUserId | QueueError::IdOutOfRange { .. } => {
                ErrorKind::InvalidInput
            }
            QueueError::AlreadyFlagged { .. } | QueueError::RecentlyQueued { .. } => {
                ErrorKind::Conflict
            }
            QueueError::Lookup(inner) => inner.kind(),
            QueueError::Store(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::NotFound => ErrorKind::NotFound,
            KeyError::Store(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// Master error type for all Roscoe errors.
#[derive(Debug, Clone, Error)]
pub enum RoscoeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl RoscoeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoscoeError::Store(e) => e.kind(),
            RoscoeError::Source(_) => ErrorKind::UpstreamUnavailable,
            RoscoeError::Sync(e) => e.kind(),
            RoscoeError::Lookup(e) => e.kind(),
            RoscoeError::Queue(e) => e.kind(),
            RoscoeError::Key(e) => e.kind(),
            RoscoeError::Config(_) => ErrorKind::InvalidInput,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
