//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CrawlStore trait.

use crate::state::EntryStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CrawlStore, StoreError, StoreResult};
use crate::storage::{QueueEntry, QueueStats, RunRecord, RunStatus};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Longest error message kept on a queue row
const MAX_ERROR_MESSAGE_CHARS: usize = 255;

const ENTRY_COLUMNS: &str =
    "run_id, url, depth, status, retry_count, discovered_at, updated_at, error_message";

/// SQLite storage backend
///
/// The connection sits behind a mutex so the store can be shared between
/// workers as `Arc<dyn CrawlStore>`. Other processes may open the same file;
/// WAL mode and a busy timeout keep their writes serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a store at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Builds the error for a status write that matched no `in_progress` row
    fn transition_error(
        conn: &Connection,
        run_id: &str,
        url: &str,
        to: EntryStatus,
    ) -> StoreError {
        let current = conn
            .query_row(
                "SELECT status FROM queue WHERE run_id = ?1 AND url = ?2",
                params![run_id, url],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match current {
            Ok(Some(status)) => StoreError::InvalidTransition {
                url: url.to_string(),
                from: EntryStatus::from_db_string(&status).unwrap_or(EntryStatus::Error),
                to,
            },
            Ok(None) => StoreError::EntryNotFound {
                run_id: run_id.to_string(),
                url: url.to_string(),
            },
            Err(e) => StoreError::Sqlite(e),
        }
    }
}

/// Current time in the store's timestamp format
///
/// Microsecond precision keeps discovery order stable within a batch.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        run_id: row.get(0)?,
        url: row.get(1)?,
        depth: row.get(2)?,
        status: EntryStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(EntryStatus::Error),
        retry_count: row.get(4)?,
        discovered_at: row.get(5)?,
        updated_at: row.get(6)?,
        error_message: row.get(7)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        updated_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn truncate_message(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return "unknown error".to_string();
    }
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

impl CrawlStore for SqliteStore {
    // ===== Run Management =====

    fn begin_run(&self, run_id: &str, config_hash: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let now = now();
        conn.execute(
            "INSERT INTO runs (run_id, started_at, updated_at, config_hash, status)
             VALUES (?1, ?2, ?2, ?3, ?4)
             ON CONFLICT(run_id) DO UPDATE SET
                updated_at = excluded.updated_at,
                config_hash = excluded.config_hash,
                status = excluded.status,
                finished_at = NULL",
            params![run_id, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(())
    }

    fn finish_run(&self, run_id: &str, status: RunStatus) -> StoreResult<()> {
        let conn = self.conn()?;
        let now = now();
        let finished_at = (status != RunStatus::Running).then(|| now.clone());
        conn.execute(
            "UPDATE runs SET status = ?1, updated_at = ?2, finished_at = ?3 WHERE run_id = ?4",
            params![status.to_db_string(), now, finished_at, run_id],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> StoreResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT run_id, started_at, updated_at, finished_at, config_hash, status
                 FROM runs WHERE run_id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    fn list_runs(&self) -> StoreResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, started_at, updated_at, finished_at, config_hash, status
             FROM runs ORDER BY started_at DESC, run_id ASC",
        )?;
        let runs = stmt
            .query_map([], row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Queue =====

    fn enqueue(&self, run_id: &str, url: &str, depth: u32) -> StoreResult<bool> {
        let conn = self.conn()?;
        let now = now();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO queue
                (run_id, url, depth, status, retry_count, discovered_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![run_id, url, depth, EntryStatus::Pending.to_db_string(), now],
        )?;
        Ok(inserted == 1)
    }

    fn claim_batch(&self, run_id: &str, limit: u32) -> StoreResult<Vec<QueueEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut entries = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM queue
                 WHERE run_id = ?1 AND status = ?2
                 ORDER BY discovered_at ASC, rowid ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(
                params![run_id, EntryStatus::Pending.to_db_string(), i64::from(limit)],
                row_to_entry,
            )?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let now = now();
        {
            let mut update = tx.prepare(
                "UPDATE queue SET status = ?1, updated_at = ?2 WHERE run_id = ?3 AND url = ?4",
            )?;
            for entry in &mut entries {
                update.execute(params![
                    EntryStatus::InProgress.to_db_string(),
                    now,
                    run_id,
                    entry.url
                ])?;
                entry.status = EntryStatus::InProgress;
                entry.updated_at = now.clone();
            }
        }

        tx.commit()?;
        Ok(entries)
    }

    fn mark_complete(&self, run_id: &str, url: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE queue SET status = ?1, updated_at = ?2, error_message = NULL
             WHERE run_id = ?3 AND url = ?4 AND status = ?5",
            params![
                EntryStatus::Complete.to_db_string(),
                now(),
                run_id,
                url,
                EntryStatus::InProgress.to_db_string()
            ],
        )?;

        if changed == 0 {
            return Err(Self::transition_error(
                &conn,
                run_id,
                url,
                EntryStatus::Complete,
            ));
        }
        Ok(())
    }

    fn mark_error(
        &self,
        run_id: &str,
        url: &str,
        message: &str,
        max_retries: u32,
    ) -> StoreResult<EntryStatus> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = tx
            .query_row(
                "SELECT status, retry_count FROM queue WHERE run_id = ?1 AND url = ?2",
                params![run_id, url],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
            )
            .optional()?;

        let retry_count = match current {
            None => {
                return Err(StoreError::EntryNotFound {
                    run_id: run_id.to_string(),
                    url: url.to_string(),
                })
            }
            Some((status, retry_count)) => {
                let status = EntryStatus::from_db_string(&status).unwrap_or(EntryStatus::Error);
                if !status.can_transition_to(EntryStatus::Error) {
                    return Err(StoreError::InvalidTransition {
                        url: url.to_string(),
                        from: status,
                        to: EntryStatus::Error,
                    });
                }
                retry_count
            }
        };

        let attempts = retry_count.saturating_add(1);
        let (next, error_message) = if attempts <= max_retries {
            (EntryStatus::Pending, None)
        } else {
            (EntryStatus::Error, Some(truncate_message(message)))
        };

        tx.execute(
            "UPDATE queue SET status = ?1, retry_count = ?2, error_message = ?3, updated_at = ?4
             WHERE run_id = ?5 AND url = ?6",
            params![next.to_db_string(), attempts, error_message, now(), run_id, url],
        )?;
        tx.commit()?;

        Ok(next)
    }

    fn stats(&self, run_id: &str) -> StoreResult<QueueStats> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM queue WHERE run_id = ?1 GROUP BY status")?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut stats = QueueStats::default();
        for row in rows {
            let (status, count) = row?;
            let count = count.max(0) as u64;
            match EntryStatus::from_db_string(&status) {
                Some(EntryStatus::Pending) => stats.pending = count,
                Some(EntryStatus::InProgress) => stats.in_progress = count,
                Some(EntryStatus::Complete) => stats.complete = count,
                Some(EntryStatus::Error) | None => stats.error += count,
            }
        }
        Ok(stats)
    }

    fn resume(&self, run_id: &str) -> StoreResult<u64> {
        let conn = self.conn()?;
        let reset = conn.execute(
            "UPDATE queue SET status = ?1, updated_at = ?2 WHERE run_id = ?3 AND status = ?4",
            params![
                EntryStatus::Pending.to_db_string(),
                now(),
                run_id,
                EntryStatus::InProgress.to_db_string()
            ],
        )?;
        Ok(reset as u64)
    }

    fn requeue_errors(&self, run_id: &str) -> StoreResult<u64> {
        let conn = self.conn()?;
        let requeued = conn.execute(
            "UPDATE queue SET status = ?1, retry_count = 0, error_message = NULL, updated_at = ?2
             WHERE run_id = ?3 AND status = ?4",
            params![
                EntryStatus::Pending.to_db_string(),
                now(),
                run_id,
                EntryStatus::Error.to_db_string()
            ],
        )?;
        Ok(requeued as u64)
    }

    // ===== Inspection =====

    fn get_entry(&self, run_id: &str, url: &str) -> StoreResult<Option<QueueEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM queue WHERE run_id = ?1 AND url = ?2"),
                params![run_id, url],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn entries(&self, run_id: &str) -> StoreResult<Vec<QueueEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM queue WHERE run_id = ?1
             ORDER BY discovered_at ASC, rowid ASC"
        ))?;
        let entries = stmt
            .query_map(params![run_id], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn seed_urls(&self, run_id: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url FROM queue WHERE run_id = ?1 AND depth = 0
             ORDER BY discovered_at ASC, rowid ASC",
        )?;
        let urls = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }
}
