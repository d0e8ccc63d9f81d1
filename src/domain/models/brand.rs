//! Normalized brand metrics records.
//!
//! These are immutable snapshots produced by the transform layer at fetch
//! time. They are cached as-is and never mutated in place.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked subject (brand) in the upstream metrics provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: u64,
    pub name: String,
}

/// Coarse sentiment classification of a narrative or brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Percentages of items per sentiment class.
///
/// Values are individually rounded, so they need not sum to exactly 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

/// Mention-volume growth classification between adjacent 24h windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Accelerating,
    Steady,
    Decelerating,
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerating => write!(f, "accelerating"),
            Self::Steady => write!(f, "steady"),
            Self::Decelerating => write!(f, "decelerating"),
        }
    }
}

/// A clustered storyline with aggregate metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub mention_count: u64,
    pub avg_sentiment: f64,
    pub relevancy: f64,
    pub risk_score: f64,
    pub sentiment: SentimentLabel,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// A single piece of coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub channel: Option<String>,
    pub sentiment: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub narrative_id: Option<String>,
}

/// Summary row for one brand in the overview listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandOverview {
    pub id: u64,
    pub name: String,
    pub narrative_count: usize,
    pub total_mentions: u64,
    /// Mention-weighted average sentiment across narratives.
    pub avg_sentiment: f64,
    /// Highest narrative risk score.
    pub risk_score: f64,
    pub sentiment_breakdown: SentimentBreakdown,
    pub top_narrative: Option<String>,
}

/// Overview fields plus the full narrative list, riskiest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandDetail {
    #[serde(flatten)]
    pub overview: BrandOverview,
    pub narratives: Vec<Narrative>,
}

/// Volume dynamics for one brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendInsight {
    pub workspace_id: u64,
    pub name: String,
    pub total_mentions: u64,
    pub recent_24h: u64,
    pub previous_24h: u64,
    /// Percent change from the previous 24h window to the most recent one.
    pub growth_rate: f64,
    /// Mentions per hour over the most recent 24h window.
    pub velocity: f64,
    pub momentum: Momentum,
    pub half_life_days: u32,
    pub sentiment_breakdown: SentimentBreakdown,
    pub channels: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_flattens_overview_fields() {
        let detail = BrandDetail {
            overview: BrandOverview {
                id: 7,
                name: "Brand B".to_string(),
                narrative_count: 0,
                total_mentions: 0,
                avg_sentiment: 0.0,
                risk_score: 0.0,
                sentiment_breakdown: SentimentBreakdown::default(),
                top_narrative: None,
            },
            narratives: vec![],
        };

        let json = serde_json::to_value(&detail).expect("detail should serialize");
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Brand B");
        assert!(json["narratives"].as_array().is_some());
    }

    #[test]
    fn test_labels_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&Momentum::Accelerating).unwrap(),
            "\"accelerating\""
        );
        assert_eq!(SentimentLabel::Negative.to_string(), "negative");
    }
}
