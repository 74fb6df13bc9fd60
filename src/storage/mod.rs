//! Storage module for persisting the crawl frontier
//!
//! This module handles all database operations for the frontier, including:
//! - SQLite database initialization and schema management
//! - The per-run URL queue with its status lifecycle
//! - Retry bookkeeping and crash recovery
//! - Run tracking for resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CrawlStore, StoreError, StoreResult};

use crate::state::EntryStatus;

use std::path::Path;

/// Opens (or creates) a SQLite-backed crawl store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::open(path)
}

/// A URL known to a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub run_id: String,
    pub url: String,
    /// Hops from a seed; seeds have depth 0
    pub depth: u32,
    pub status: EntryStatus,
    pub retry_count: u32,
    pub discovered_at: String,
    pub updated_at: String,
    /// Last failure reason, only set when `status` is `Error`
    pub error_message: Option<String>,
}

/// Entry counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub in_progress: u64,
    pub complete: u64,
    pub error: u64,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.complete + self.error
    }

    /// Entries in a terminal status
    pub fn resolved(&self) -> u64 {
        self.complete + self.error
    }

    pub fn count(&self, status: EntryStatus) -> u64 {
        match status {
            EntryStatus::Pending => self.pending,
            EntryStatus::InProgress => self.in_progress,
            EntryStatus::Complete => self.complete,
            EntryStatus::Error => self.error,
        }
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
