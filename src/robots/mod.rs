//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files, and for answering allow/deny per URL.

mod cache;
mod checker;
mod parser;

pub use cache::{CachedRobots, FAILURE_TTL};
pub use checker::{RobotsChecker, RobotsVerdict};
pub use parser::{product_token, ParsedRobots};
