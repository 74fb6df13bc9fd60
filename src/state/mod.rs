//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryStatus`: the persisted status of a queue entry (pending, in progress, complete, error)
//! - `DomainState`: in-memory per-domain timing used by the rate limiter

mod domain_state;
mod entry_status;

// Re-export main types
pub use domain_state::DomainState;
pub use entry_status::EntryStatus;
