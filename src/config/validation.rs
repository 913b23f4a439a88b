use crate::config::types::{Config, CrawlerConfig, FetchConfig, SearchConfig, UserAgentConfig};
use crate::url::Canonicalizer;
use crate::ConfigError;
use url::Url;

/// Upper bound on the fetch worker pool
pub const MAX_WORKERS: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates the worker count
///
/// Shared with [`crate::crawler::Crawler::new`] so that engines built without a
/// config file are held to the same limits.
pub fn validate_workers(workers: usize) -> Result<(), ConfigError> {
    if workers < 1 || workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, workers
        )));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed
    validate_workers(config.workers)
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates fetch policy
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates keyword and seeds
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let keyword = config.keyword.trim();
    if keyword.is_empty() {
        return Err(ConfigError::Validation(
            "keyword cannot be empty".to_string(),
        ));
    }

    if keyword != config.keyword {
        return Err(ConfigError::Validation(format!(
            "keyword must not start or end with whitespace, got '{}'",
            config.keyword
        )));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    let canonicalizer = Canonicalizer::default();
    for seed in &config.seeds {
        canonicalizer.canonicalize(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;
    }

    Ok(())
}
