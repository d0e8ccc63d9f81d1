//! Domain layer for the brandpulse data service
//!
//! This module contains the domain records, the response envelope, the error
//! taxonomy and the port traits implemented by infrastructure adapters.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ServiceError, ServiceResult};
