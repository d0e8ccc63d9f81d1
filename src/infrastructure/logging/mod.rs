//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber, with optional
//! rolling JSON files and a throttle for repetitive warnings.

pub mod logger;
pub mod throttle;

pub use logger::LoggerImpl;
pub use throttle::WarnThrottle;
