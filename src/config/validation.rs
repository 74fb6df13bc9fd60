use crate::config::types::{Config, CrawlConfig, OutputConfig, RunConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_run_config(&config.run)?;
    Ok(())
}

/// Validates the crawler settings handed to a run
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.max_parallel < 1 || config.max_parallel > 100 {
        return Err(ConfigError::Validation(format!(
            "max-parallel must be between 1 and 100, got {}",
            config.max_parallel
        )));
    }

    if config.fetch_timeout < 10 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout must be >= 10s, got {}s",
            config.fetch_timeout
        )));
    }

    if config.robots_timeout < 1 || config.robots_timeout > 10 {
        return Err(ConfigError::Validation(format!(
            "robots-timeout must be between 1 and 10 seconds, got {}s",
            config.robots_timeout
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.tracking_params.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "tracking-params cannot contain empty names".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    Ok(())
}
