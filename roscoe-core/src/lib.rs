//! Roscoe Core - Domain Types
//!
//! Pure data structures shared by every other crate: flag records as they
//! leave the primary store, the views served by lookups, queue entries,
//! API key records, tunables and the error taxonomy.
//!
//! This crate performs no I/O.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;

pub use config::{
    LookupConfig, QueueConfig, SyncConfig, DEFAULT_BATCH_SIZE, DEFAULT_LOOKUP_LIMIT,
    DEFAULT_MAX_CONCURRENT, DEFAULT_RETENTION_WINDOW, MAX_LOOKUP_LIMIT,
};
pub use entities::{
    collapse_duplicates, parse_reasons, ApiKeyRecord, FlagRecord, FlagView, QueueEntry, Reason,
    Reasons,
};
pub use enums::{FlagType, NO_FLAG, QUEUED_POSITIVE};
pub use error::{
    ConfigError, ErrorKind, KeyError, LookupError, QueueError, RoscoeError, SourceError,
    StoreError, SyncError,
};

/// User identifier as issued by the upstream platform. Always `> 0`.
pub type UserId = u64;

/// Largest id the remote store can hold (`INTEGER PRIMARY KEY` is signed 64-bit).
pub const MAX_STORABLE_USER_ID: UserId = i64::MAX as UserId;

/// Seconds since the Unix epoch, the representation used in every table.
pub type UnixSeconds = i64;
