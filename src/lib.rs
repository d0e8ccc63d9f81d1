//! Brandpulse - cached, coalesced and rate-limited access to a brand metrics API
//!
//! The crate sits in front of an external metrics provider and exposes
//! domain-level read operations (brand overview, brand detail, narratives,
//! mentions, trend insights) that always answer with a uniform
//! [`ResponseEnvelope`].
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): records, envelope, error taxonomy and ports
//! - **Service Layer** (`services`): cache store, request coalescer, cooldown
//!   tracker, transform layer and the data service facade
//! - **Infrastructure Layer** (`infrastructure`): HTTP client, configuration, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use brandpulse::{ConfigLoader, DataService, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let service = DataService::from_config(&config);
//!     let overview = service.brand_overview(&QueryOptions::default()).await;
//!     println!("{}", serde_json::to_string_pretty(&overview)?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    BrandDetail, BrandOverview, Config, Mention, Narrative, QueryOptions, ResponseEnvelope,
    SortOrder, TrendInsight, Workspace,
};
pub use domain::ports::MetricsClient;
pub use domain::{ServiceError, ServiceResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::metrics_api::HttpMetricsClient;
pub use services::{CacheStats, DataService};
