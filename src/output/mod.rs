//! Output module for reporting crawl progress
//!
//! The queue table is the source of truth; this module only reads it and
//! formats per-run statistics and the run registry for the CLI.

pub mod stats;

pub use stats::{load_statistics, print_runs, print_statistics, RunStatistics};
