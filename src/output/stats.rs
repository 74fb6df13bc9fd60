//! Statistics generation from the crawl store
//!
//! This module provides functionality for extracting and displaying
//! per-run progress from the storage layer.

use crate::state::EntryStatus;
use crate::storage::{CrawlStore, QueueStats, RunRecord};
use crate::Result;
use std::collections::BTreeMap;

/// Progress summary for one run
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run_id: String,

    /// Run registry row, absent for runs that were never started
    pub run: Option<RunRecord>,

    /// Entry counts by status
    pub stats: QueueStats,

    /// Entry count per depth
    pub depth_breakdown: BTreeMap<u32, u64>,

    /// Permanently failed URLs with their last error
    pub errors: Vec<(String, String)>,
}

/// Loads statistics for `run_id` from the store
pub fn load_statistics(store: &dyn CrawlStore, run_id: &str) -> Result<RunStatistics> {
    let run = store.get_run(run_id)?;
    let stats = store.stats(run_id)?;

    let mut depth_breakdown = BTreeMap::new();
    let mut errors = Vec::new();
    for entry in store.entries(run_id)? {
        *depth_breakdown.entry(entry.depth).or_insert(0) += 1;
        if entry.status == EntryStatus::Error {
            errors.push((entry.url, entry.error_message.unwrap_or_default()));
        }
    }

    Ok(RunStatistics {
        run_id: run_id.to_string(),
        run,
        stats,
        depth_breakdown,
        errors,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Run {} ===\n", stats.run_id);

    match &stats.run {
        Some(run) => {
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("  (no run record)"),
    }
    println!();

    let total = stats.stats.total();
    println!("Entries by Status ({} total):", total);
    for status in EntryStatus::all() {
        let count = stats.stats.count(status);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.depth_breakdown.is_empty() {
        println!("Entries by Depth:");
        for (depth, count) in &stats.depth_breakdown {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.errors.is_empty() {
        println!("Errors ({}):", stats.errors.len());
        for (url, message) in &stats.errors {
            println!("  - {}: {}", url, message);
        }
    }
}

/// Prints the run registry, one line per run
pub fn print_runs(runs: &[RunRecord]) {
    if runs.is_empty() {
        println!("No runs recorded");
        return;
    }

    println!("{:<24} {:<12} {:<34} FINISHED", "RUN", "STATUS", "STARTED");
    for run in runs {
        println!(
            "{:<24} {:<12} {:<34} {}",
            run.run_id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-")
        );
    }
}
