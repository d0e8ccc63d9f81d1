//! Infrastructure layer module
//!
//! This module contains the adapters and external integrations:
//! - Metrics API HTTP client
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod metrics_api;
