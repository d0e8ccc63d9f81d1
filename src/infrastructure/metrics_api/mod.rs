//! Metrics API integration
//!
//! reqwest client for the upstream brand metrics API with bearer auth,
//! a per-request timeout and status classification.

pub mod client;
pub mod errors;

pub use client::{HttpMetricsClient, HttpMetricsClientConfig};
pub use errors::MetricsApiError;
