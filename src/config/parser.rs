use crate::config::types::{Config, CrawlConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use chrono::Local;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 fingerprint of the crawler settings
///
/// Stored on the run row so a resume under different settings can be detected.
pub fn config_fingerprint(config: &CrawlConfig) -> Result<String, ConfigError> {
    let serialized = toml::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Generates a run identifier from the local clock, e.g. `20240131_142502`
pub fn generate_run_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Restricts a user-supplied run id to `[A-Za-z0-9_-]`
///
/// Falls back to a generated id when nothing usable remains.
pub fn sanitize_run_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if cleaned.is_empty() {
        generate_run_id()
    } else {
        cleaned
    }
}
