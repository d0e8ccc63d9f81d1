//! Cache statistics for the current process.
//!
//! The cache lives only as long as the process, so the command first loads
//! the requested brands (repeatedly, to exercise the cache) and then reports.

use tracing::warn;

use crate::cli::output::output;
use crate::domain::models::QueryOptions;
use crate::services::DataService;

pub async fn execute(service: &DataService, brands: &[String], repeat: u32, json: bool) -> bool {
    let options = QueryOptions::default();

    for _ in 0..repeat {
        for brand in brands {
            let envelope = service.brand_detail(brand, &options).await;
            if let Some(error) = envelope.error {
                warn!(brand = %brand, code = %error.code, "failed to load brand");
            }
        }
    }

    output(&service.cache_stats().await, json)
}
