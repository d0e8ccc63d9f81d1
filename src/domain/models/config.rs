use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::query::ResourceKind;

/// Main configuration structure for brandpulse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Upstream metrics API configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Cache sizing and TTL configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream cooldown configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream metrics API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Feature toggle for the whole data layer
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the metrics API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token, if the API requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout enforced by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.example.com/v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// TTL used when a caller does not pass one
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Interval of the background prune task; disabled when unset
    #[serde(default)]
    pub prune_interval_secs: Option<u64>,

    /// Per-resource TTLs
    #[serde(default)]
    pub ttl: TtlConfig,
}

const fn default_max_size() -> usize {
    500
}

const fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            default_ttl_secs: default_ttl_secs(),
            prune_interval_secs: None,
            ttl: TtlConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn prune_interval(&self) -> Option<Duration> {
        self.prune_interval_secs.map(Duration::from_secs)
    }
}

/// TTL classes, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TtlConfig {
    #[serde(default = "default_workspaces_ttl")]
    pub workspaces: u64,
    #[serde(default = "default_overview_ttl")]
    pub overview: u64,
    #[serde(default = "default_overview_ttl")]
    pub detail: u64,
    #[serde(default = "default_narratives_ttl")]
    pub narratives: u64,
    #[serde(default = "default_mentions_ttl")]
    pub mentions: u64,
    #[serde(default = "default_trends_ttl")]
    pub trends: u64,
}

const fn default_workspaces_ttl() -> u64 {
    3600
}

const fn default_overview_ttl() -> u64 {
    300
}

const fn default_narratives_ttl() -> u64 {
    600
}

const fn default_mentions_ttl() -> u64 {
    120
}

const fn default_trends_ttl() -> u64 {
    900
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            workspaces: default_workspaces_ttl(),
            overview: default_overview_ttl(),
            detail: default_overview_ttl(),
            narratives: default_narratives_ttl(),
            mentions: default_mentions_ttl(),
            trends: default_trends_ttl(),
        }
    }
}

impl TtlConfig {
    pub fn for_resource(&self, resource: ResourceKind) -> Duration {
        let secs = match resource {
            ResourceKind::Workspaces => self.workspaces,
            ResourceKind::Overview => self.overview,
            ResourceKind::Detail => self.detail,
            ResourceKind::Narratives => self.narratives,
            ResourceKind::Mentions => self.mentions,
            ResourceKind::Trends => self.trends,
        };
        Duration::from_secs(secs)
    }

    pub fn all(&self) -> [(ResourceKind, u64); 6] {
        [
            (ResourceKind::Workspaces, self.workspaces),
            (ResourceKind::Overview, self.overview),
            (ResourceKind::Detail, self.detail),
            (ResourceKind::Narratives, self.narratives),
            (ResourceKind::Mentions, self.mentions),
            (ResourceKind::Trends, self.trends),
        ]
    }
}

/// Upstream cooldown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Minimum interval between two upstream calls to the same endpoint
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Window in which a repeated endpoint call is answered with the last result
    #[serde(default = "default_echo_window_ms")]
    pub echo_window_ms: u64,
}

const fn default_min_interval_ms() -> u64 {
    3000
}

const fn default_echo_window_ms() -> u64 {
    2000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            echo_window_ms: default_echo_window_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
