use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid cache max_size: {0}. Must be at least 1")]
    InvalidMaxSize(usize),

    #[error("Invalid TTL for {0}: must be greater than 0 seconds")]
    InvalidTtl(String),

    #[error("Invalid min_interval_ms: {0}. Must be positive")]
    InvalidMinInterval(u64),

    #[error("Invalid prune_interval_secs: {0}. Must be positive")]
    InvalidPruneInterval(u64),

    #[error("Metrics base_url cannot be empty while metrics are enabled")]
    EmptyBaseUrl,

    #[error("Invalid metrics timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .brandpulse/config.yaml (project config)
    /// 3. .brandpulse/local.yaml (local overrides, optional)
    /// 4. Environment variables (BRANDPULSE_* prefix, `__` separates levels)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(".brandpulse/config.yaml"))
            .merge(Yaml::file(".brandpulse/local.yaml"))
            .merge(Env::prefixed("BRANDPULSE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("BRANDPULSE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(config.cache.max_size));
        }

        if config.cache.default_ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl("default".to_string()));
        }

        for (resource, secs) in config.cache.ttl.all() {
            if secs == 0 {
                return Err(ConfigError::InvalidTtl(resource.to_string()));
            }
        }

        if let Some(0) = config.cache.prune_interval_secs {
            return Err(ConfigError::InvalidPruneInterval(0));
        }

        if config.rate_limit.min_interval_ms == 0 {
            return Err(ConfigError::InvalidMinInterval(
                config.rate_limit.min_interval_ms,
            ));
        }

        if config.metrics.enabled {
            if config.metrics.base_url.trim().is_empty() {
                return Err(ConfigError::EmptyBaseUrl);
            }
            if config.metrics.timeout_secs == 0 {
                return Err(ConfigError::InvalidTimeout(config.metrics.timeout_secs));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{CacheConfig, MetricsConfig, RateLimitConfig};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.max_size, 500);
        assert_eq!(config.cache.ttl.workspaces, 3600);
        assert_eq!(config.rate_limit.min_interval_ms, 3000);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
metrics:
  base_url: https://metrics.internal/api
  api_key: secret
  timeout_secs: 5
cache:
  max_size: 50
  ttl:
    mentions: 30
rate_limit:
  min_interval_ms: 500
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.metrics.base_url, "https://metrics.internal/api");
        assert_eq!(config.metrics.api_key.as_deref(), Some("secret"));
        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.cache.ttl.mentions, 30);
        // Unspecified TTL classes keep their defaults.
        assert_eq!(config.cache.ttl.narratives, 600);
        assert_eq!(config.rate_limit.min_interval_ms, 500);
        assert_eq!(config.rate_limit.echo_window_ms, 2000);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_max_size() {
        let config = Config {
            cache: CacheConfig {
                max_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxSize(0))
        ));
    }

    #[test]
    fn test_validate_zero_ttl_names_resource() {
        let mut config = Config::default();
        config.cache.ttl.trends = 0;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTtl(ref r) if r == "trends"));
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = Config {
            rate_limit: RateLimitConfig {
                min_interval_ms: 0,
                echo_window_ms: 0,
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMinInterval(0))
        ));
    }

    #[test]
    fn test_empty_base_url_only_matters_when_enabled() {
        let mut config = Config {
            metrics: MetricsConfig {
                base_url: "  ".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyBaseUrl)
        ));

        config.metrics.enabled = false;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_logging_values() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        config.logging.level = "warn".to_string();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        config.logging.format = "pretty".to_string();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }
}
