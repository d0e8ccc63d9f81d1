//! Data service facade.
//!
//! Composes the request coalescer (and its cache store), the cooldown
//! tracker and the transform layer in front of a [`MetricsClient`]. Every
//! public operation returns a [`ResponseEnvelope`]; errors never escape as
//! `Err`.
//!
//! One instance is built by the process entry point and shared by reference
//! (it is also cheap to clone: every field is shared).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{ServiceError, ServiceResult};
use crate::domain::models::{
    BrandDetail, BrandOverview, Config, Mention, Narrative, QueryOptions, ResolvedQuery,
    ResourceKind, ResponseEnvelope, TimeWindow, TrendInsight, TtlConfig, Workspace,
};
use crate::domain::ports::MetricsClient;
use crate::infrastructure::logging::WarnThrottle;
use crate::infrastructure::metrics_api::HttpMetricsClient;
use crate::services::cache_pruner::{CachePruner, PrunerHandle};
use crate::services::cache_store::CacheStore;
use crate::services::cooldown_tracker::{CooldownTracker, Recorded};
use crate::services::request_coalescer::{CacheStats, RequestCoalescer};
use crate::services::transform::{self, PayloadShape};

const WORKSPACES_KEY: &str = "workspaces:all";

fn finish<T>(operation: &str, result: ServiceResult<(T, bool)>) -> ResponseEnvelope<T> {
    if let Err(err) = &result {
        match err {
            ServiceError::NotFound(_) | ServiceError::ServiceUnavailable(_) => {
                debug!(operation, error = %err, "operation failed");
            }
            _ => warn!(operation, error = %err, "operation failed"),
        }
    }
    ResponseEnvelope::from(result)
}

/// A transformed record as held in the shared cache.
#[derive(Debug, Clone)]
pub enum CachedRecord {
    Workspaces(Vec<Workspace>),
    Overview(BrandOverview),
    Detail(BrandDetail),
    Narratives(Vec<Narrative>),
    Mentions(Vec<Mention>),
    Trend(TrendInsight),
}

trait Cacheable: Sized + Send + 'static {
    fn into_record(self) -> CachedRecord;
    fn from_record(record: CachedRecord) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_record(self) -> CachedRecord {
                CachedRecord::$variant(self)
            }

            fn from_record(record: CachedRecord) -> Option<Self> {
                match record {
                    CachedRecord::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Vec<Workspace>, Workspaces);
cacheable!(BrandOverview, Overview);
cacheable!(BrandDetail, Detail);
cacheable!(Vec<Narrative>, Narratives);
cacheable!(Vec<Mention>, Mentions);
cacheable!(TrendInsight, Trend);

/// A cached record plus the instant its upstream payload was fetched.
///
/// Cache entries expire relative to `fetched_at`, so a record built from an
/// echoed payload, or from other cached records, never outlives its data.
#[derive(Debug, Clone)]
pub struct StampedRecord {
    pub record: CachedRecord,
    pub fetched_at: Instant,
}

/// Result of a cached load inside the facade.
struct Loaded<T> {
    value: T,
    cached: bool,
    fetched_at: Instant,
}

impl<T> Loaded<T> {
    fn into_pair(self) -> (T, bool) {
        (self.value, self.cached)
    }
}

/// One upstream call, named the way the cooldown tracker keys it.
#[derive(Debug, Clone)]
enum Endpoint {
    Workspaces,
    Narratives(u64, TimeWindow),
    Mentions(u64, TimeWindow),
}

impl Endpoint {
    fn resource(&self) -> ResourceKind {
        match self {
            Self::Workspaces => ResourceKind::Workspaces,
            Self::Narratives(..) => ResourceKind::Narratives,
            Self::Mentions(..) => ResourceKind::Mentions,
        }
    }

    /// Cooldown key: one per upstream endpoint, whatever the window.
    fn name(&self) -> String {
        match self {
            Self::Workspaces => "workspaces".to_string(),
            Self::Narratives(id, _) => format!("narratives/{id}"),
            Self::Mentions(id, _) => format!("mentions/{id}"),
        }
    }

    /// Echo key: the endpoint plus everything sent upstream with it.
    fn request_key(&self) -> String {
        match self {
            Self::Workspaces => self.name(),
            Self::Narratives(_, window) | Self::Mentions(_, window) => {
                format!("{}/{}", self.name(), window.canonical())
            }
        }
    }
}

/// Domain-level read operations over the metrics API.
#[derive(Clone)]
pub struct DataService {
    client: Option<Arc<dyn MetricsClient>>,
    unavailable_reason: Option<String>,
    coalescer: RequestCoalescer<StampedRecord>,
    cooldown: Arc<CooldownTracker<Value>>,
    ttl: TtlConfig,
    warnings: Arc<WarnThrottle>,
}

impl DataService {
    /// Build a service around an existing client.
    ///
    /// With `metrics.enabled = false` the client is ignored and every
    /// operation reports `ServiceUnavailable`.
    pub fn new(client: Arc<dyn MetricsClient>, config: &Config) -> Self {
        if config.metrics.enabled {
            Self::build(Some(client), None, config)
        } else {
            Self::disabled(config)
        }
    }

    /// Build a service with the HTTP client described by `config.metrics`.
    ///
    /// A client that fails to construct leaves the service unavailable
    /// rather than failing startup.
    pub fn from_config(config: &Config) -> Self {
        if !config.metrics.enabled {
            return Self::disabled(config);
        }

        match HttpMetricsClient::from_config(&config.metrics) {
            Ok(client) => Self::build(Some(Arc::new(client)), None, config),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "metrics client failed to construct");
                Self::build(
                    None,
                    Some(format!("metrics client failed to construct: {err:#}")),
                    config,
                )
            }
        }
    }

    /// A service whose operations all report `ServiceUnavailable`.
    pub fn disabled(config: &Config) -> Self {
        Self::build(None, Some("metrics data layer is disabled".to_string()), config)
    }

    fn build(
        client: Option<Arc<dyn MetricsClient>>,
        unavailable_reason: Option<String>,
        config: &Config,
    ) -> Self {
        let store = CacheStore::new(config.cache.max_size, config.cache.default_ttl());
        Self {
            client,
            unavailable_reason,
            coalescer: RequestCoalescer::new(store),
            cooldown: Arc::new(CooldownTracker::new(
                config.rate_limit.min_interval(),
                config.rate_limit.echo_window(),
            )),
            ttl: config.cache.ttl.clone(),
            warnings: Arc::new(WarnThrottle::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Start a background task pruning expired cache entries.
    pub fn start_pruner(&self, interval: Duration) -> PrunerHandle {
        CachePruner::new(self.coalescer.clone(), interval).start()
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// All tracked workspaces.
    #[instrument(skip(self))]
    pub async fn workspaces(&self) -> ResponseEnvelope<Vec<Workspace>> {
        finish("workspaces", self.try_workspaces().await)
    }

    /// One overview row per workspace. Workspaces whose narratives cannot be
    /// loaded are left out instead of failing the whole listing.
    #[instrument(skip(self, options))]
    pub async fn brand_overview(&self, options: &QueryOptions) -> ResponseEnvelope<Vec<BrandOverview>> {
        finish("overview", self.try_overview(options).await)
    }

    #[instrument(skip(self, options))]
    pub async fn brand_detail(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ResponseEnvelope<BrandDetail> {
        finish("detail", self.try_detail(identifier, options).await)
    }

    #[instrument(skip(self, options))]
    pub async fn narratives(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ResponseEnvelope<Vec<Narrative>> {
        finish("narratives", self.try_narratives(identifier, options).await)
    }

    #[instrument(skip(self, options))]
    pub async fn mentions(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ResponseEnvelope<Vec<Mention>> {
        finish("mentions", self.try_mentions(identifier, options).await)
    }

    #[instrument(skip(self, options))]
    pub async fn trend_insights(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ResponseEnvelope<TrendInsight> {
        finish("trends", self.try_trends(identifier, options).await)
    }

    /// Cache counters and sizing. Available even when the service is disabled.
    pub async fn cache_stats(&self) -> ResponseEnvelope<CacheStats> {
        ResponseEnvelope::ok(self.coalescer.stats().await, false)
    }

    /// Drop every cached record and pending fetch.
    ///
    /// The cooldown and its echoed payloads are kept, so a clear cannot be
    /// used to burst the upstream API.
    pub async fn clear_cache(&self) {
        self.coalescer.clear().await;
        info!("cache cleared");
    }

    /// Remove expired entries now; returns how many were removed.
    pub async fn prune_cache(&self) -> usize {
        self.coalescer.prune().await
    }

    // ------------------------------------------------------------------
    // Operation bodies
    // ------------------------------------------------------------------

    fn ensure_available(&self) -> ServiceResult<&Arc<dyn MetricsClient>> {
        self.client.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "metrics client unavailable".to_string()),
            )
        })
    }

    async fn try_workspaces(&self) -> ServiceResult<(Vec<Workspace>, bool)> {
        self.ensure_available()?;
        Ok(self.load_workspaces().await?.into_pair())
    }

    async fn try_overview(&self, options: &QueryOptions) -> ServiceResult<(Vec<BrandOverview>, bool)> {
        self.ensure_available()?;
        let query = options.resolve(ResourceKind::Overview, Utc::now());
        let workspaces = self.load_workspaces().await?;

        let lookups = workspaces.value.into_iter().map(|workspace| {
            let this = self.clone();
            let query = query.clone();
            async move {
                let result = this.load_overview(&workspace, &query).await;
                (workspace, result)
            }
        });

        let mut all_cached = workspaces.cached;
        let mut rows = Vec::new();
        for (workspace, result) in join_all(lookups).await {
            match result {
                Ok(row) => {
                    all_cached &= row.cached;
                    rows.push(row.value);
                }
                Err(err) => {
                    if self.warnings.should_log(&format!("overview/{}", workspace.id)) {
                        warn!(
                            workspace_id = workspace.id,
                            workspace = %workspace.name,
                            error = %err,
                            "dropping workspace from overview"
                        );
                    }
                }
            }
        }

        Ok((transform::filter_overviews(rows, &query), all_cached))
    }

    async fn try_detail(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ServiceResult<(BrandDetail, bool)> {
        self.ensure_available()?;
        let workspace = self.resolve_workspace(identifier).await?;
        let query = options.resolve(ResourceKind::Detail, Utc::now());
        let key = query.cache_key(&workspace.id.to_string());

        let this = self.clone();
        let loader_query = query.clone();
        let loaded = self
            .cached(key, self.ttl.for_resource(ResourceKind::Detail), async move {
                let narratives = this.load_narratives(workspace.id, &loader_query).await?;
                Ok((
                    transform::build_detail(&workspace, &narratives.value),
                    narratives.fetched_at,
                ))
            })
            .await?;

        let (mut detail, cached) = loaded.into_pair();
        detail.narratives = transform::filter_narratives(detail.narratives, &query);
        Ok((detail, cached))
    }

    async fn try_narratives(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ServiceResult<(Vec<Narrative>, bool)> {
        self.ensure_available()?;
        let workspace = self.resolve_workspace(identifier).await?;
        let query = options.resolve(ResourceKind::Narratives, Utc::now());
        let (narratives, cached) = self.load_narratives(workspace.id, &query).await?.into_pair();
        Ok((transform::filter_narratives(narratives, &query), cached))
    }

    async fn try_mentions(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ServiceResult<(Vec<Mention>, bool)> {
        self.ensure_available()?;
        let workspace = self.resolve_workspace(identifier).await?;
        let query = options.resolve(ResourceKind::Mentions, Utc::now());
        let (mentions, cached) = self.load_mentions(workspace.id, &query).await?.into_pair();
        Ok((transform::filter_mentions(mentions, &query), cached))
    }

    async fn try_trends(
        &self,
        identifier: &str,
        options: &QueryOptions,
    ) -> ServiceResult<(TrendInsight, bool)> {
        self.ensure_available()?;
        let workspace = self.resolve_workspace(identifier).await?;
        let query = options.resolve(ResourceKind::Trends, Utc::now());
        let key = query.cache_key(&workspace.id.to_string());

        let this = self.clone();
        let loaded = self
            .cached(key, self.ttl.for_resource(ResourceKind::Trends), async move {
                let mentions = this.load_mentions(workspace.id, &query).await?;
                let insight =
                    transform::build_trend_insight(&workspace, &mentions.value, query.window.to);
                Ok((insight, mentions.fetched_at))
            })
            .await?;
        Ok(loaded.into_pair())
    }

    // ------------------------------------------------------------------
    // Cached loaders
    // ------------------------------------------------------------------

    /// Resolve a numeric id or a case-insensitive workspace name.
    async fn resolve_workspace(&self, identifier: &str) -> ServiceResult<Workspace> {
        let identifier = identifier.trim();

        if let Ok(id) = identifier.parse::<u64>() {
            // Numeric ids are used directly; borrow the name if the listing
            // happens to be cached already.
            let known = match self.coalescer.peek(WORKSPACES_KEY).await {
                Some(StampedRecord {
                    record: CachedRecord::Workspaces(list),
                    ..
                }) => list.into_iter().find(|w| w.id == id),
                _ => None,
            };
            return Ok(known.unwrap_or_else(|| Workspace {
                id,
                name: format!("Workspace {id}"),
            }));
        }

        let wanted = identifier.to_lowercase();
        let workspaces = self.load_workspaces().await?;
        workspaces
            .value
            .into_iter()
            .find(|w| w.name.trim().to_lowercase() == wanted)
            .ok_or_else(|| ServiceError::NotFound(format!("no workspace matches '{identifier}'")))
    }

    async fn load_workspaces(&self) -> ServiceResult<Loaded<Vec<Workspace>>> {
        let this = self.clone();
        self.cached(
            WORKSPACES_KEY.to_string(),
            self.ttl.for_resource(ResourceKind::Workspaces),
            async move {
                let (items, fetched_at) = this.fetch_items(Endpoint::Workspaces).await?;
                Ok((transform::parse_workspaces(&items), fetched_at))
            },
        )
        .await
    }

    async fn load_overview(
        &self,
        workspace: &Workspace,
        query: &ResolvedQuery,
    ) -> ServiceResult<Loaded<BrandOverview>> {
        let key = query.cache_key(&workspace.id.to_string());
        let this = self.clone();
        let workspace = workspace.clone();
        let query = query.clone();
        self.cached(key, self.ttl.for_resource(ResourceKind::Overview), async move {
            let narratives = this.load_narratives(workspace.id, &query).await?;
            Ok((
                transform::build_overview(&workspace, &narratives.value),
                narratives.fetched_at,
            ))
        })
        .await
    }

    async fn load_narratives(
        &self,
        workspace_id: u64,
        query: &ResolvedQuery,
    ) -> ServiceResult<Loaded<Vec<Narrative>>> {
        let query = query.for_resource(ResourceKind::Narratives);
        let key = query.cache_key(&workspace_id.to_string());
        let this = self.clone();
        self.cached(key, self.ttl.for_resource(ResourceKind::Narratives), async move {
            let (items, fetched_at) = this
                .fetch_items(Endpoint::Narratives(workspace_id, query.window))
                .await?;
            Ok((transform::parse_narratives(&items), fetched_at))
        })
        .await
    }

    async fn load_mentions(
        &self,
        workspace_id: u64,
        query: &ResolvedQuery,
    ) -> ServiceResult<Loaded<Vec<Mention>>> {
        let query = query.for_resource(ResourceKind::Mentions);
        let key = query.cache_key(&workspace_id.to_string());
        let this = self.clone();
        self.cached(key, self.ttl.for_resource(ResourceKind::Mentions), async move {
            let (items, fetched_at) = this
                .fetch_items(Endpoint::Mentions(workspace_id, query.window))
                .await?;
            Ok((transform::parse_mentions(&items), fetched_at))
        })
        .await
    }

    /// Coalesce `fetch` under `key` and cache its successful result.
    ///
    /// `fetch` reports when its underlying payload was fetched upstream; the
    /// entry lives for what remains of `ttl` from that instant, and is not
    /// stored at all once that is nothing. The write happens inside the
    /// fetch itself, so the value is visible in the cache before the pending
    /// marker is dropped and failures are never stored.
    async fn cached<T, Fut>(&self, key: String, ttl: Duration, fetch: Fut) -> ServiceResult<Loaded<T>>
    where
        T: Cacheable,
        Fut: Future<Output = ServiceResult<(T, Instant)>> + Send + 'static,
    {
        let writer = self.coalescer.clone();
        let insert_key = key.clone();
        let coalesced = self
            .coalescer
            .dedupe(&key, move || async move {
                let (value, fetched_at) = fetch.await?;
                let stamped = StampedRecord {
                    record: value.into_record(),
                    fetched_at,
                };
                let remaining = ttl.saturating_sub(fetched_at.elapsed());
                if remaining.is_zero() {
                    debug!(key = %insert_key, "payload older than its TTL, not caching");
                } else {
                    writer.insert(insert_key, stamped.clone(), Some(remaining)).await;
                }
                Ok(stamped)
            })
            .await?;

        let cached = coalesced.is_cached();
        let StampedRecord { record, fetched_at } = coalesced.value;
        T::from_record(record)
            .map(|value| Loaded {
                value,
                cached,
                fetched_at,
            })
            .ok_or_else(|| {
                ServiceError::UnexpectedShape(format!("cache entry '{key}' holds another record type"))
            })
    }

    // ------------------------------------------------------------------
    // Upstream access
    // ------------------------------------------------------------------

    /// Fetch and normalize one endpoint's items, with the instant the
    /// payload was fetched.
    ///
    /// A payload in none of the accepted shapes yields no items and a
    /// throttled warning.
    async fn fetch_items(&self, endpoint: Endpoint) -> ServiceResult<(Vec<Value>, Instant)> {
        let resource = endpoint.resource();
        let Recorded { value, recorded_at } = self.fetch_raw(endpoint).await?;
        let normalized = transform::normalize(value, resource.as_str());

        if normalized.shape == PayloadShape::Unrecognized
            && self.warnings.should_log(&format!("shape/{resource}"))
        {
            warn!(
                resource = %resource,
                error = %ServiceError::UnexpectedShape(format!("{resource} payload is not a list")),
                "treating payload as empty"
            );
        }

        Ok((normalized.items, recorded_at))
    }

    /// Rate-checked upstream call.
    ///
    /// A repeat of the same request (endpoint and window) inside the echo
    /// window gets the previous payload. A call blocked by the endpoint's
    /// cooldown gets the same request's payload if it was fetched within the
    /// cooldown interval, or `RateLimited` otherwise.
    async fn fetch_raw(&self, endpoint: Endpoint) -> ServiceResult<Recorded<Value>> {
        let client = self.ensure_available()?;
        let name = endpoint.name();
        let request = endpoint.request_key();

        if let Some(echo) = self.cooldown.echo(&request).await {
            debug!(request = %request, "answering from echo window");
            return Ok(echo);
        }

        if let Err(wait) = self.cooldown.check(&name) {
            if let Some(last) = self.cooldown.last_known(&request).await {
                debug!(request = %request, "cooldown active, serving recent payload");
                return Ok(last);
            }
            return Err(ServiceError::RateLimited {
                retry_after_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            });
        }

        info!(endpoint = %name, "fetching from metrics API");
        let result = match &endpoint {
            Endpoint::Workspaces => client.get_workspaces().await,
            Endpoint::Narratives(id, window) => client.get_narratives(*id, window).await,
            Endpoint::Mentions(id, window) => client.get_mentions(*id, window).await,
        };

        let payload = result.map_err(|err| ServiceError::upstream(&err))?;
        let recorded_at = self.cooldown.record(&request, payload.clone()).await;
        Ok(Recorded {
            value: payload,
            recorded_at,
        })
    }
}
