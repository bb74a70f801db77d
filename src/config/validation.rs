use crate::config::types::Config;
use crate::url::resolve_url;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_start_urls(&config.spider_start)?;

    if !config.test_dir.is_absolute() {
        return Err(ConfigError::Validation(format!(
            "test-dir must be an absolute path, got '{}'",
            config.test_dir.display()
        )));
    }

    if config.max_sockets < 1 || config.max_sockets > 100 {
        return Err(ConfigError::Validation(format!(
            "max-sockets must be between 1 and 100, got {}",
            config.max_sockets
        )));
    }

    if config.idle_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "idle-timeout-ms must be greater than 0".to_string(),
        ));
    }

    if config.reporters.split(',').all(|key| key.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one reporter is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates the start URLs
fn validate_start_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::Validation(
            "spider-start must list at least one URL".to_string(),
        ));
    }

    for url in urls {
        resolve_url(url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", url, e))
        })?;
    }

    Ok(())
}
