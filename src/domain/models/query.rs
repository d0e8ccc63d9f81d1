//! Caller option bags, resource kinds and cache-key derivation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, DurationRound, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Resource classes served by the data service.
///
/// Each class has its own default lookback window and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Workspaces,
    Overview,
    Detail,
    Narratives,
    Mentions,
    Trends,
}

impl ResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workspaces => "workspaces",
            Self::Overview => "overview",
            Self::Detail => "detail",
            Self::Narratives => "narratives",
            Self::Mentions => "mentions",
            Self::Trends => "trends",
        }
    }

    /// Default `since` offset applied when the caller omits one.
    pub fn default_lookback(self) -> Duration {
        match self {
            Self::Workspaces | Self::Overview | Self::Detail | Self::Narratives => {
                Duration::hours(48)
            }
            Self::Mentions => Duration::days(7),
            // One extra day so the week-old window used by the half-life
            // estimate is inside the fetched range.
            Self::Trends => Duration::days(8),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering applied to narrative and mention lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Risk,
    Mentions,
    Sentiment,
    Recent,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk => write!(f, "risk"),
            Self::Mentions => write!(f, "mentions"),
            Self::Sentiment => write!(f, "sentiment"),
            Self::Recent => write!(f, "recent"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "risk" => Ok(Self::Risk),
            "mentions" | "volume" => Ok(Self::Mentions),
            "sentiment" => Ok(Self::Sentiment),
            "recent" | "date" => Ok(Self::Recent),
            _ => Err(anyhow::anyhow!("Invalid sort order: {s}")),
        }
    }
}

/// Optional parameters supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub sort: Option<SortOrder>,
    pub since: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sentiment_min: Option<f64>,
    pub sentiment_max: Option<f64>,
    pub channel: Option<String>,
}

impl QueryOptions {
    /// Merge resource defaults into the options.
    ///
    /// A missing `to` becomes `now` truncated to the whole minute, and a
    /// missing `since` becomes `to` minus the resource lookback, so callers
    /// that omit the window within the same minute resolve identically.
    pub fn resolve(&self, resource: ResourceKind, now: DateTime<Utc>) -> ResolvedQuery {
        let to = self.to.unwrap_or_else(|| {
            now.duration_trunc(Duration::minutes(1)).unwrap_or(now)
        });
        let since = self.since.unwrap_or(to - resource.default_lookback());
        let channel = self
            .channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        ResolvedQuery {
            resource,
            window: TimeWindow { since, to, channel },
            limit: self.limit,
            sort: self.sort,
            sentiment_min: self.sentiment_min,
            sentiment_max: self.sentiment_max,
        }
    }
}

/// The part of a query that is sent upstream and therefore keys the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl TimeWindow {
    /// Canonical `since..to[@channel]` form used inside cache keys.
    pub fn canonical(&self) -> String {
        let mut out = format!(
            "{}..{}",
            self.since.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.to.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        if let Some(channel) = &self.channel {
            out.push('@');
            out.push_str(channel);
        }
        out
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.since && at <= self.to
    }
}

/// Options after defaults have been merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub resource: ResourceKind,
    pub window: TimeWindow,
    pub limit: Option<usize>,
    pub sort: Option<SortOrder>,
    pub sentiment_min: Option<f64>,
    pub sentiment_max: Option<f64>,
}

impl ResolvedQuery {
    /// Stable cache key for this query against `subject`.
    ///
    /// Only the upstream window participates: limit, sort and sentiment
    /// filters are applied to the cached records after retrieval.
    pub fn cache_key(&self, subject: &str) -> String {
        format!("{}:{}:{}", self.resource, subject, self.window.canonical())
    }

    /// Same window, different resource class.
    pub fn for_resource(&self, resource: ResourceKind) -> Self {
        Self {
            resource,
            ..self.clone()
        }
    }

    pub fn sentiment_in_range(&self, sentiment: f64) -> bool {
        self.sentiment_min.is_none_or(|min| sentiment >= min)
            && self.sentiment_max.is_none_or(|max| sentiment <= max)
    }
}
