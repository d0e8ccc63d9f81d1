//! Service layer
//!
//! Leaves first: the cache store, cooldown tracker and transform layer have
//! no dependencies; the request coalescer wraps the cache store; the data
//! service composes all of them in front of a metrics client.

pub mod cache_pruner;
pub mod cache_store;
pub mod cooldown_tracker;
pub mod data_service;
pub mod request_coalescer;
pub mod transform;

pub use cache_pruner::{CachePruner, PrunerHandle, PrunerStatus};
pub use cache_store::{CacheCounters, CacheStore, EntryInfo};
pub use cooldown_tracker::{CooldownTracker, Recorded, TokioClock};
pub use data_service::{CachedRecord, DataService, StampedRecord};
pub use request_coalescer::{CacheStats, Coalesced, RequestCoalescer, Source};
