use crate::config::types::{CaptchaConfig, Config, CrawlerConfig, OutputConfig, ProxyEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_captcha_config(&config.captcha)?;
    validate_output_config(&config.output)?;
    validate_proxies(&config.proxies)?;
    validate_base_url("rightmove.base-url", &config.rightmove.base_url)?;
    validate_base_url("openrent.base-url", &config.openrent.base_url)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.target_count < 1 {
        return Err(ConfigError::Validation(
            "target_count must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.requests_per_minute < 1 || config.requests_per_minute > 600 {
        return Err(ConfigError::Validation(format!(
            "requests_per_minute must be between 1 and 600, got {}",
            config.requests_per_minute
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_min_ms ({}) must not exceed backoff_max_ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    if config.max_consecutive_failures < 1 {
        return Err(ConfigError::Validation(
            "max_consecutive_failures must be >= 1".to_string(),
        ));
    }

    if config.proxy_failure_threshold < 1 {
        return Err(ConfigError::Validation(
            "proxy_failure_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the CAPTCHA service settings
fn validate_captcha_config(config: &CaptchaConfig) -> Result<(), ConfigError> {
    if config.service_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "captcha.service_key cannot be empty".to_string(),
        ));
    }

    validate_base_url("captcha.api-base", &config.api_base)?;

    if config.max_polls < 1 {
        return Err(ConfigError::Validation(
            "captcha.max_polls must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output.directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the proxy pool
fn validate_proxies(proxies: &[ProxyEntry]) -> Result<(), ConfigError> {
    if proxies.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[proxies]] entry is required".to_string(),
        ));
    }

    for (index, proxy) in proxies.iter().enumerate() {
        if proxy.host.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "proxy #{} has an empty host",
                index + 1
            )));
        }

        if proxy.host.contains("://") || proxy.host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "proxy host '{}' must be a bare host name",
                proxy.host
            )));
        }

        if proxy.port == 0 {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' must have a non-zero port",
                proxy.host
            )));
        }

        if proxy.username.is_empty() || proxy.password.is_empty() {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' is missing credentials",
                proxy.host
            )));
        }
    }

    Ok(())
}

/// Validates that a configured URL is absolute http(s)
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
