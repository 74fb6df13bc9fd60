//! Storage traits and error types
//!
//! This module defines the trait interface for crawl store backends and
//! associated error types.

use crate::state::EntryStatus;
use crate::storage::{QueueEntry, QueueStats, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during store operations
///
/// Every variant is fatal to a run: losing a status write would break resume.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entry not found in run {run_id}: {url}")]
    EntryNotFound { run_id: String, url: String },

    #[error("Invalid status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("Store connection lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable record of a crawl frontier
///
/// Every operation is scoped by `run_id`. Implementations must make each call
/// atomic, so several workers (or processes) can share one store.
pub trait CrawlStore: Send + Sync {
    // ===== Run Management =====

    /// Creates a run row, or flips an existing one back to `running`
    fn begin_run(&self, run_id: &str, config_hash: &str) -> StoreResult<()>;

    /// Records how a run ended
    fn finish_run(&self, run_id: &str, status: RunStatus) -> StoreResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: &str) -> StoreResult<Option<RunRecord>>;

    /// Lists all runs, most recently started first
    fn list_runs(&self) -> StoreResult<Vec<RunRecord>>;

    // ===== Queue =====

    /// Inserts a `pending` entry
    ///
    /// Returns `false` (not an error) when the URL is already known to the run.
    fn enqueue(&self, run_id: &str, url: &str, depth: u32) -> StoreResult<bool>;

    /// Moves up to `limit` pending entries to `in_progress` and returns them
    ///
    /// Entries come oldest `discovered_at` first. The select and update share
    /// one transaction so concurrent callers never receive the same entry.
    fn claim_batch(&self, run_id: &str, limit: u32) -> StoreResult<Vec<QueueEntry>>;

    /// Marks a claimed entry complete
    fn mark_complete(&self, run_id: &str, url: &str) -> StoreResult<()>;

    /// Records a failed attempt on a claimed entry
    ///
    /// Increments `retry_count`; while it stays within `max_retries` the entry
    /// returns to `pending`, otherwise it becomes `error` with the message set.
    /// Returns the status the entry ended up in.
    fn mark_error(
        &self,
        run_id: &str,
        url: &str,
        message: &str,
        max_retries: u32,
    ) -> StoreResult<EntryStatus>;

    /// Counts entries per status
    fn stats(&self, run_id: &str) -> StoreResult<QueueStats>;

    /// Resets entries left `in_progress` by a crashed process to `pending`
    ///
    /// Returns the number of entries reclaimed.
    fn resume(&self, run_id: &str) -> StoreResult<u64>;

    /// Moves every `error` entry back to `pending` with a fresh retry budget
    fn requeue_errors(&self, run_id: &str) -> StoreResult<u64>;

    // ===== Inspection =====

    /// Gets a single entry
    fn get_entry(&self, run_id: &str, url: &str) -> StoreResult<Option<QueueEntry>>;

    /// All entries of a run in discovery order
    fn entries(&self, run_id: &str) -> StoreResult<Vec<QueueEntry>>;

    /// URLs of the run's depth-0 entries
    fn seed_urls(&self, run_id: &str) -> StoreResult<Vec<String>>;
}
