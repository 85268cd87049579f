//! Remote store schema.
//!
//! Table names are fixed: readers resolve `user_flags` on every query, so the
//! swap must leave that name bound at every instant.

/// Live flag table served to readers.
pub const LIVE_TABLE: &str = "user_flags";

/// Staging table written by a sync run.
pub const STAGING_TABLE: &str = "new_flags";

/// Idempotent creation of every long-lived table and index.
pub const ENSURE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS user_flags (
    user_id INTEGER PRIMARY KEY,
    flag_type INTEGER NOT NULL,
    confidence REAL NOT NULL,
    reasons TEXT
);
CREATE TABLE IF NOT EXISTS api_keys (
    key TEXT PRIMARY KEY,
    description TEXT,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS queued_users (
    user_id INTEGER PRIMARY KEY,
    queued_at INTEGER NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    processing INTEGER NOT NULL DEFAULT 0,
    flagged INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_queue_status
    ON queued_users (processed, processing, queued_at)
    WHERE processed = 0 AND processing = 0;
CREATE INDEX IF NOT EXISTS idx_processed_flagged
    ON queued_users (processed, flagged)
    WHERE processed = 1 AND flagged = 1;
";

/// Drop and recreate the staging table.
pub const RESET_STAGING: &str = "
DROP TABLE IF EXISTS new_flags;
CREATE TABLE new_flags (
    user_id INTEGER PRIMARY KEY,
    flag_type INTEGER NOT NULL,
    confidence REAL NOT NULL,
    reasons TEXT
);
";

/// Rename-based cutover from staging to live, sent as one statement batch.
///
/// The leading drop clears an `old_flags` left behind by an interrupted run.
pub const SWAP_TABLES: &str = "
DROP TABLE IF EXISTS old_flags;
ALTER TABLE user_flags RENAME TO old_flags;
ALTER TABLE new_flags RENAME TO user_flags;
DROP TABLE old_flags;
";

/// Multi-row insert into staging for `rows` records (four parameters each).
pub fn staging_insert(rows: usize) -> String {
    let mut sql = String::with_capacity(80 + rows * 14);
    sql.push_str("INSERT INTO new_flags (user_id, flag_type, confidence, reasons) VALUES ");
    for i in 0..rows {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str("(?, ?, ?, ?)");
    }
    sql
}

/// Comma-separated `?` placeholders for an `IN (...)` list.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
