pub mod brand;
pub mod config;
pub mod envelope;
pub mod query;

pub use brand::{
    BrandDetail, BrandOverview, Mention, Momentum, Narrative, SentimentBreakdown, SentimentLabel,
    TrendInsight, Workspace,
};
pub use config::{CacheConfig, Config, LoggingConfig, MetricsConfig, RateLimitConfig, TtlConfig};
pub use envelope::{ErrorInfo, ResponseEnvelope};
pub use query::{QueryOptions, ResolvedQuery, ResourceKind, SortOrder, TimeWindow};
