//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - MetricsClient: upstream brand metrics API operations
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod metrics_client;

pub use metrics_client::MetricsClient;
