use crate::config::types::{BlacklistEntry, Config, HttpConfig, ScanConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scan_config(&config.scan)?;
    validate_http_config(&config.http)?;
    validate_database_path("queue.database-path", &config.queue.database_path)?;
    validate_database_path("output.database-path", &config.output.database_path)?;
    validate_blacklist_entries(&config.blacklist)?;
    validate_token_patterns(&config.invalid_tokens)?;
    Ok(())
}

/// Validates scan configuration
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url: {}", e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "seed-url must use http or https, got '{}'",
            seed.scheme()
        )));
    }

    if seed.host_str().is_none() {
        return Err(ConfigError::Validation(
            "seed-url must have a host".to_string(),
        ));
    }

    validate_regex("host-pattern", &config.host_pattern)?;
    validate_regex("path-pattern", &config.path_pattern)?;

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.allowed_content_types.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-content-types cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a database path setting
fn validate_database_path(key: &str, path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
    }
    Ok(())
}

/// Validates blacklist entries
fn validate_blacklist_entries(entries: &[BlacklistEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if entry.host.is_empty() {
            return Err(ConfigError::Validation(
                "blacklist entry host cannot be empty".to_string(),
            ));
        }

        for path in &entry.paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "blacklist path '{}' for host '{}' must start with '/'",
                    path, entry.host
                )));
            }
        }

        for token in &entry.query_tokens {
            if token.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "blacklist query token for host '{}' cannot be empty",
                    entry.host
                )));
            }
        }
    }
    Ok(())
}

/// Validates the global invalid-token patterns
fn validate_token_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        validate_regex("invalid-tokens", pattern)?;
    }
    Ok(())
}

/// Validates that a pattern string compiles as a regex
fn validate_regex(key: &str, pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "{} cannot be empty",
            key
        )));
    }

    Regex::new(pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!("{} '{}' is not a valid regex: {}", key, pattern, e))
    })?;

    Ok(())
}

/// Validates a scan name supplied on the command line
///
/// The name is embedded in queue table names, so it is restricted to
/// alphanumerics and underscores.
pub fn validate_scan_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "scan name cannot be empty".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "scan name must contain only alphanumeric characters and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_config() -> ScanConfig {
        ScanConfig {
            description: None,
            seed_url: "https://example.com/".to_string(),
            host_pattern: r"(^|\.)example\.com$".to_string(),
            path_pattern: "^/".to_string(),
        }
    }

    #[test]
    fn test_valid_scan_config() {
        assert!(validate_scan_config(&scan_config()).is_ok());
    }

    #[test]
    fn test_seed_url_must_be_http() {
        let mut config = scan_config();
        config.seed_url = "ftp://example.com/".to_string();
        assert!(validate_scan_config(&config).is_err());
    }

    #[test]
    fn test_seed_url_must_parse() {
        let mut config = scan_config();
        config.seed_url = "not a url".to_string();
        assert!(matches!(
            validate_scan_config(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_bad_host_pattern_rejected() {
        let mut config = scan_config();
        config.host_pattern = "(unclosed".to_string();
        assert!(matches!(
            validate_scan_config(&config).unwrap_err(),
            ConfigError::InvalidPattern(_)
        ));
    }

    #[test]
    fn test_http_timeout_bounds() {
        let mut config = HttpConfig::default();
        assert!(validate_http_config(&config).is_ok());

        config.timeout_secs = 0;
        assert!(validate_http_config(&config).is_err());

        config.timeout_secs = 301;
        assert!(validate_http_config(&config).is_err());
    }

    #[test]
    fn test_blacklist_path_must_be_absolute() {
        let entry = BlacklistEntry {
            host: "host".to_string(),
            block_all: false,
            scheme: None,
            paths: vec!["relative".to_string()],
            query_tokens: vec![],
            netloc: None,
        };
        assert!(validate_blacklist_entries(&[entry]).is_err());
    }

    #[test]
    fn test_validate_scan_name() {
        assert!(validate_scan_name("docs_site_2026").is_ok());
        assert!(validate_scan_name("Scan01").is_ok());

        assert!(validate_scan_name("").is_err());
        assert!(validate_scan_name("has space").is_err());
        assert!(validate_scan_name("has-hyphen").is_err());
        assert!(validate_scan_name("semi;colon").is_err());
    }
}
