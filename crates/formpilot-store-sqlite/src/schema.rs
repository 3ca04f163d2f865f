//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
-- Replayable fill plans, one row per platform key.
-- Never hard-deleted; re-recordings bump the version in place.
CREATE TABLE IF NOT EXISTS recipes (
    platform_key TEXT PRIMARY KEY,
    ats_type TEXT NOT NULL,
    steps TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    recording_cost REAL NOT NULL,
    replay_cost REAL NOT NULL,
    times_used INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    success_rate REAL NOT NULL DEFAULT 0.0,
    total_saved REAL NOT NULL DEFAULT 0.0,
    last_used TEXT,
    last_failure TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Append-only attempt outcomes.
CREATE TABLE IF NOT EXISTS executions (
    id TEXT PRIMARY KEY,
    platform_key TEXT NOT NULL,
    success INTEGER NOT NULL,
    method TEXT NOT NULL,
    cost REAL NOT NULL,
    error TEXT,
    timestamp TEXT NOT NULL
);

-- Append-only recovery observations; duplicates expected.
CREATE TABLE IF NOT EXISTS recovery_learnings (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    company TEXT NOT NULL,
    fields TEXT NOT NULL,
    responses TEXT NOT NULL,
    issues TEXT NOT NULL,
    solution TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_executions_platform ON executions(platform_key);
CREATE INDEX IF NOT EXISTS idx_executions_timestamp ON executions(timestamp);
CREATE INDEX IF NOT EXISTS idx_learnings_url ON recovery_learnings(url);
"#;
