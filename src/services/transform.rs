//! Pure conversions from raw upstream payloads into domain records.
//!
//! Nothing here performs I/O or touches shared state. Item parsing is
//! lenient: camelCase and snake_case spellings are both accepted, ids may be
//! numbers or strings, and missing numeric fields read as zero. Items that
//! are not JSON objects are skipped.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::domain::models::{
    BrandDetail, BrandOverview, Mention, Momentum, Narrative, ResolvedQuery, SentimentBreakdown,
    SentimentLabel, SortOrder, TrendInsight, Workspace,
};

/// Average sentiment strictly above this is positive.
pub const POSITIVE_THRESHOLD: f64 = 10.0;
/// Average sentiment at or below this is negative.
pub const NEGATIVE_THRESHOLD: f64 = -10.0;
/// Growth above this percentage is accelerating.
pub const ACCELERATING_GROWTH: f64 = 50.0;
/// Growth below this percentage is decelerating.
pub const DECELERATING_GROWTH: f64 = -30.0;

const RISK_MIN: f64 = 0.0;
const RISK_MAX: f64 = 100.0;
const HALF_LIFE_MIN: u32 = 1;
const HALF_LIFE_MAX: u32 = 99;
/// Days between the week-old window and the most recent window.
const HALF_LIFE_SPAN_DAYS: f64 = 6.0;

/// Which of the accepted shapes a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `[...]`
    Bare,
    /// `{"data": [...]}`
    DataWrapped,
    /// `{"<resource>": [...]}`
    Named,
    /// Anything else; normalized to an empty sequence.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub items: Vec<Value>,
    pub shape: PayloadShape,
}

/// Reduce any of the three accepted payload shapes to a plain sequence.
pub fn normalize(payload: Value, resource_name: &str) -> Normalized {
    match payload {
        Value::Array(items) => Normalized {
            items,
            shape: PayloadShape::Bare,
        },
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("data") {
                return Normalized {
                    items,
                    shape: PayloadShape::DataWrapped,
                };
            }
            if let Some(Value::Array(items)) = map.remove(resource_name) {
                return Normalized {
                    items,
                    shape: PayloadShape::Named,
                };
            }
            unrecognized()
        }
        _ => unrecognized(),
    }
}

fn unrecognized() -> Normalized {
    Normalized {
        items: Vec::new(),
        shape: PayloadShape::Unrecognized,
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|v| !v.is_null()))
}

fn field_f64(obj: &Map<String, Value>, names: &[&str]) -> f64 {
    match field(obj, names) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn field_u64(obj: &Map<String, Value>, names: &[&str]) -> u64 {
    match field(obj, names) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn field_string(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match field(obj, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_datetime(obj: &Map<String, Value>, names: &[&str]) -> Option<DateTime<Utc>> {
    match field(obj, names)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Treat large values as epoch milliseconds.
            if raw.abs() >= 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse workspace items, skipping any without a numeric id.
pub fn parse_workspaces(items: &[Value]) -> Vec<Workspace> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let id = field_string(obj, &["id", "workspaceId", "workspace_id"])?
                .parse()
                .ok()?;
            let name = field_string(obj, &["name", "title", "workspaceName", "workspace_name"])
                .unwrap_or_else(|| format!("Workspace {id}"));
            Some(Workspace { id, name })
        })
        .collect()
}

pub fn parse_narratives(items: &[Value]) -> Vec<Narrative> {
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(index, obj)| {
            let avg_sentiment = field_f64(
                obj,
                &["avgSentiment", "avg_sentiment", "averageSentiment", "average_sentiment", "sentiment"],
            );
            let relevancy = field_f64(obj, &["relevancy", "relevance", "relevancyScore", "relevancy_score"]);
            let mention_count = field_u64(
                obj,
                &["mentionCount", "mention_count", "mentions", "volume", "count"],
            );

            Narrative {
                id: field_string(obj, &["id", "narrativeId", "narrative_id"])
                    .unwrap_or_else(|| format!("narrative-{index}")),
                title: field_string(obj, &["title", "name", "label"])
                    .unwrap_or_else(|| "Untitled narrative".to_string()),
                summary: field_string(obj, &["summary", "description"]),
                mention_count,
                avg_sentiment,
                relevancy,
                risk_score: risk_score(avg_sentiment, relevancy, mention_count),
                sentiment: classify_sentiment(avg_sentiment),
                first_seen: field_datetime(obj, &["firstSeen", "first_seen", "createdAt", "created_at"]),
                last_seen: field_datetime(obj, &["lastSeen", "last_seen", "updatedAt", "updated_at"]),
            }
        })
        .collect()
}

pub fn parse_mentions(items: &[Value]) -> Vec<Mention> {
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(index, obj)| Mention {
            id: field_string(obj, &["id", "mentionId", "mention_id"])
                .unwrap_or_else(|| format!("mention-{index}")),
            title: field_string(obj, &["title", "headline"]),
            snippet: field_string(obj, &["snippet", "text", "content", "summary"]),
            url: field_string(obj, &["url", "link"]),
            source: field_string(obj, &["source", "sourceName", "source_name", "outlet"]),
            channel: field_string(obj, &["channel", "sourceType", "source_type", "medium"])
                .map(|c| c.to_lowercase()),
            sentiment: field_f64(obj, &["sentiment", "sentimentScore", "sentiment_score", "avgSentiment"]),
            published_at: field_datetime(
                obj,
                &["publishedAt", "published_at", "date", "timestamp", "createdAt", "created_at"],
            ),
            narrative_id: field_string(obj, &["narrativeId", "narrative_id"]),
        })
        .collect()
}

/// Weighted risk of a narrative, in `[0, 100]`, one decimal.
///
/// Negative sentiment weighs 0.5, relevancy 0.3 and log-scaled mention
/// volume 0.2.
pub fn risk_score(avg_sentiment: f64, relevancy: f64, mention_count: u64) -> f64 {
    let negativity = (-avg_sentiment).clamp(0.0, 100.0);
    let relevancy = relevancy.clamp(0.0, 100.0);
    #[allow(clippy::cast_precision_loss)]
    let volume = (25.0 * (mention_count as f64 + 1.0).log10()).min(100.0);

    let score = 0.5 * negativity + 0.3 * relevancy + 0.2 * volume;
    round1(score.clamp(RISK_MIN, RISK_MAX))
}

pub fn classify_sentiment(avg_sentiment: f64) -> SentimentLabel {
    if avg_sentiment > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if avg_sentiment <= NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Percentage of values in each sentiment class, individually rounded.
pub fn sentiment_breakdown<I>(values: I) -> SentimentBreakdown
where
    I: IntoIterator<Item = f64>,
{
    let (mut positive, mut neutral, mut negative) = (0u32, 0u32, 0u32);
    for value in values {
        match classify_sentiment(value) {
            SentimentLabel::Positive => positive += 1,
            SentimentLabel::Neutral => neutral += 1,
            SentimentLabel::Negative => negative += 1,
        }
    }

    let total = positive + neutral + negative;
    if total == 0 {
        return SentimentBreakdown::default();
    }

    let pct = |count: u32| (f64::from(count) / f64::from(total) * 100.0).round() as u32;
    SentimentBreakdown {
        positive: pct(positive),
        neutral: pct(neutral),
        negative: pct(negative),
    }
}

/// Percent change from `previous` to `recent`.
///
/// With no previous volume, any recent volume counts as 100% growth.
pub fn growth_rate(recent: u64, previous: u64) -> f64 {
    if previous == 0 {
        return if recent > 0 { 100.0 } else { 0.0 };
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (recent as f64 - previous as f64) / previous as f64 * 100.0;
    round1(rate)
}

pub fn classify_momentum(growth_rate: f64) -> Momentum {
    if growth_rate > ACCELERATING_GROWTH {
        Momentum::Accelerating
    } else if growth_rate < DECELERATING_GROWTH {
        Momentum::Decelerating
    } else {
        Momentum::Steady
    }
}

/// Days for mention volume to halve, estimated from the decay between the
/// week-old window and the most recent one. Clamped to `[1, 99]`; 99 when
/// volume is flat or growing.
pub fn half_life_days(recent: u64, week_old: u64) -> u32 {
    if week_old == 0 || recent >= week_old {
        return HALF_LIFE_MAX;
    }
    if recent == 0 {
        return HALF_LIFE_MIN;
    }

    #[allow(clippy::cast_precision_loss)]
    let decay = (week_old as f64 / recent as f64).ln();
    let days = HALF_LIFE_SPAN_DAYS * std::f64::consts::LN_2 / decay;
    (days.round() as u32).clamp(HALF_LIFE_MIN, HALF_LIFE_MAX)
}

/// Aggregate a workspace's narratives into an overview row.
pub fn build_overview(workspace: &Workspace, narratives: &[Narrative]) -> BrandOverview {
    let total_mentions: u64 = narratives.iter().map(|n| n.mention_count).sum();

    #[allow(clippy::cast_precision_loss)]
    let avg_sentiment = if narratives.is_empty() {
        0.0
    } else if total_mentions == 0 {
        narratives.iter().map(|n| n.avg_sentiment).sum::<f64>() / narratives.len() as f64
    } else {
        narratives
            .iter()
            .map(|n| n.avg_sentiment * n.mention_count as f64)
            .sum::<f64>()
            / total_mentions as f64
    };

    let riskiest = narratives
        .iter()
        .max_by(|a, b| a.risk_score.total_cmp(&b.risk_score));

    BrandOverview {
        id: workspace.id,
        name: workspace.name.clone(),
        narrative_count: narratives.len(),
        total_mentions,
        avg_sentiment: round1(avg_sentiment),
        risk_score: riskiest.map_or(0.0, |n| n.risk_score),
        sentiment_breakdown: sentiment_breakdown(narratives.iter().map(|n| n.avg_sentiment)),
        top_narrative: riskiest.map(|n| n.title.clone()),
    }
}

pub fn build_detail(workspace: &Workspace, narratives: &[Narrative]) -> BrandDetail {
    let mut sorted = narratives.to_vec();
    sort_narratives(&mut sorted, SortOrder::Risk);
    BrandDetail {
        overview: build_overview(workspace, narratives),
        narratives: sorted,
    }
}

/// Volume dynamics of `mentions` relative to `reference` (normally the end
/// of the query window).
pub fn build_trend_insight(
    workspace: &Workspace,
    mentions: &[Mention],
    reference: DateTime<Utc>,
) -> TrendInsight {
    let count_between = |from: DateTime<Utc>, to: DateTime<Utc>| -> u64 {
        mentions
            .iter()
            .filter_map(|m| m.published_at)
            .filter(|at| *at > from && *at <= to)
            .count() as u64
    };

    let day = Duration::hours(24);
    let recent = count_between(reference - day, reference);
    let previous = count_between(reference - day * 2, reference - day);
    let week_old = count_between(reference - Duration::days(7), reference - Duration::days(6));

    let growth = growth_rate(recent, previous);

    let mut channels = BTreeMap::new();
    for mention in mentions {
        let channel = mention.channel.clone().unwrap_or_else(|| "unknown".to_string());
        *channels.entry(channel).or_insert(0u64) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let velocity = round1(recent as f64 / 24.0);

    TrendInsight {
        workspace_id: workspace.id,
        name: workspace.name.clone(),
        total_mentions: mentions.len() as u64,
        recent_24h: recent,
        previous_24h: previous,
        growth_rate: growth,
        velocity,
        momentum: classify_momentum(growth),
        half_life_days: half_life_days(recent, week_old),
        sentiment_breakdown: sentiment_breakdown(mentions.iter().map(|m| m.sentiment)),
        channels,
    }
}

pub fn sort_narratives(narratives: &mut [Narrative], order: SortOrder) {
    match order {
        SortOrder::Risk => narratives.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score)),
        SortOrder::Mentions => narratives.sort_by(|a, b| b.mention_count.cmp(&a.mention_count)),
        SortOrder::Sentiment => {
            narratives.sort_by(|a, b| a.avg_sentiment.total_cmp(&b.avg_sentiment));
        }
        SortOrder::Recent => narratives.sort_by(|a, b| b.last_seen.cmp(&a.last_seen)),
    }
}

pub fn sort_mentions(mentions: &mut [Mention], order: SortOrder) {
    match order {
        SortOrder::Recent | SortOrder::Mentions => {
            mentions.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        }
        SortOrder::Risk | SortOrder::Sentiment => {
            mentions.sort_by(|a, b| a.sentiment.total_cmp(&b.sentiment));
        }
    }
}

/// Apply the caller's sentiment range, sort and limit to overview rows.
pub fn filter_overviews(mut rows: Vec<BrandOverview>, query: &ResolvedQuery) -> Vec<BrandOverview> {
    rows.retain(|row| query.sentiment_in_range(row.avg_sentiment));
    match query.sort {
        Some(SortOrder::Risk) => rows.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score)),
        Some(SortOrder::Mentions) => rows.sort_by(|a, b| b.total_mentions.cmp(&a.total_mentions)),
        Some(SortOrder::Sentiment) => {
            rows.sort_by(|a, b| a.avg_sentiment.total_cmp(&b.avg_sentiment));
        }
        Some(SortOrder::Recent) | None => {}
    }
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    rows
}

/// Apply the caller's sentiment range, sort and limit to cached narratives.
pub fn filter_narratives(mut narratives: Vec<Narrative>, query: &ResolvedQuery) -> Vec<Narrative> {
    narratives.retain(|n| query.sentiment_in_range(n.avg_sentiment));
    if let Some(order) = query.sort {
        sort_narratives(&mut narratives, order);
    }
    if let Some(limit) = query.limit {
        narratives.truncate(limit);
    }
    narratives
}

/// Apply the caller's channel, sentiment range, sort and limit to mentions.
pub fn filter_mentions(mut mentions: Vec<Mention>, query: &ResolvedQuery) -> Vec<Mention> {
    mentions.retain(|m| {
        query.sentiment_in_range(m.sentiment)
            && query
                .window
                .channel
                .as_deref()
                .is_none_or(|wanted| m.channel.as_deref() == Some(wanted))
    });
    if let Some(order) = query.sort {
        sort_mentions(&mut mentions, order);
    }
    if let Some(limit) = query.limit {
        mentions.truncate(limit);
    }
    mentions
}
