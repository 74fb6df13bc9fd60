//! Database schema definitions
//!
//! The queue table is keyed by `(run_id, url)` and is meant to be readable by
//! external tools for progress reporting.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per URL per run; never deleted
CREATE TABLE IF NOT EXISTS queue (
    run_id TEXT NOT NULL,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('pending', 'in_progress', 'complete', 'error')),
    retry_count INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    error_message TEXT,
    PRIMARY KEY (run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_queue_claim ON queue(run_id, status, discovered_at);
CREATE INDEX IF NOT EXISTS idx_queue_depth ON queue(run_id, depth);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
