//! Configuration loading: file values, env overrides and validation.

use std::fs;
use std::time::Duration;

use brandpulse::domain::models::ResourceKind;
use brandpulse::{ConfigError, ConfigLoader};

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, contents).expect("Failed to write config");
    (dir, path)
}

#[test]
fn test_load_from_file_merges_over_defaults() {
    let (_dir, path) = write_config(
        r"
metrics:
  base_url: http://metrics.internal:8080/api
  api_key: test-key
cache:
  max_size: 250
  ttl:
    mentions: 30
rate_limit:
  min_interval_ms: 500
",
    );

    let config = temp_env::with_vars_unset(
        ["BRANDPULSE_CACHE__MAX_SIZE", "BRANDPULSE_METRICS__ENABLED"],
        || ConfigLoader::load_from_file(&path),
    )
    .expect("config should load");

    assert_eq!(config.metrics.base_url, "http://metrics.internal:8080/api");
    assert_eq!(config.metrics.api_key.as_deref(), Some("test-key"));
    assert!(config.metrics.enabled);
    assert_eq!(config.cache.max_size, 250);
    assert_eq!(
        config.cache.ttl.for_resource(ResourceKind::Mentions),
        Duration::from_secs(30)
    );
    assert_eq!(config.rate_limit.min_interval(), Duration::from_millis(500));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_env_overrides_file() {
    let (_dir, path) = write_config("cache:\n  max_size: 250\n");

    let config = temp_env::with_vars(
        [
            ("BRANDPULSE_CACHE__MAX_SIZE", Some("42")),
            ("BRANDPULSE_METRICS__ENABLED", Some("false")),
        ],
        || ConfigLoader::load_from_file(&path),
    )
    .expect("config should load");

    assert_eq!(config.cache.max_size, 42);
    assert!(!config.metrics.enabled);
}

#[test]
fn test_zero_max_size_is_rejected() {
    let (_dir, path) = write_config("cache:\n  max_size: 0\n");

    let err = temp_env::with_vars_unset(["BRANDPULSE_CACHE__MAX_SIZE"], || {
        ConfigLoader::load_from_file(&path)
    })
    .expect_err("max_size 0 should fail validation");

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::InvalidMaxSize(0))
    ));
}

#[test]
fn test_unknown_log_level_is_rejected() {
    let (_dir, path) = write_config("logging:\n  level: verbose\n");

    let err = temp_env::with_vars_unset(["BRANDPULSE_LOGGING__LEVEL"], || {
        ConfigLoader::load_from_file(&path)
    })
    .expect_err("unknown level should fail validation");

    assert!(err.to_string().contains("verbose"));
}
