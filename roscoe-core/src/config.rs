//! Configuration types

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// Records per batch handed to one worker.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Batches in flight at once; caps remote API concurrency.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Minimum age of a queue entry before the user may be queued again.
pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Ids accepted by one batch lookup unless configured otherwise.
pub const DEFAULT_LOOKUP_LIMIT: usize = 100;

/// Upper bound for the configurable lookup limit.
pub const MAX_LOOKUP_LIMIT: usize = 1000;

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: var.to_string(),
            value: raw.clone(),
            reason: "not a valid number".to_string(),
        }),
        Err(_) => Ok(default),
    }
}

// ============================================================================
// SYNC
// ============================================================================

/// Tunables for the bulk sync pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Records per batch.
    pub batch_size: usize,
    /// Worker pool size.
    pub max_concurrent: usize,
    /// Rows per INSERT statement. Four bound parameters per row, so 25 rows
    /// stays at the remote limit of 100 parameters.
    pub rows_per_statement: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            rows_per_statement: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncConfig {
    /// Load from environment variables.
    ///
    /// - `ROSCOE_SYNC_BATCH_SIZE` (default: 25)
    /// - `ROSCOE_SYNC_MAX_CONCURRENT` (default: 5)
    /// - `ROSCOE_SYNC_ROWS_PER_STATEMENT` (default: 25)
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            batch_size: env_or("ROSCOE_SYNC_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            max_concurrent: env_or("ROSCOE_SYNC_MAX_CONCURRENT", DEFAULT_MAX_CONCURRENT)?,
            rows_per_statement: env_or("ROSCOE_SYNC_ROWS_PER_STATEMENT", DEFAULT_BATCH_SIZE)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("batch_size", self.batch_size),
            ("max_concurrent", self.max_concurrent),
            ("rows_per_statement", self.rows_per_statement),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of batches `total` records are split into.
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }
}

// ============================================================================
// QUEUE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub retention_window: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention_window: DEFAULT_RETENTION_WINDOW,
        }
    }
}

// ============================================================================
// LOOKUP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupConfig {
    /// Maximum ids per batch lookup request.
    pub batch_limit: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_LOOKUP_LIMIT,
        }
    }
}

impl LookupConfig {
    /// Load from `ROSCOE_LOOKUP_BATCH_LIMIT` (default: 100, allowed 1..=1000).
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            batch_limit: env_or("ROSCOE_LOOKUP_BATCH_LIMIT", DEFAULT_LOOKUP_LIMIT)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_limit == 0 || self.batch_limit > MAX_LOOKUP_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "batch_limit".to_string(),
                value: self.batch_limit.to_string(),
                reason: format!("must be between 1 and {}", MAX_LOOKUP_LIMIT),
            });
        }
        Ok(())
    }
}
