//! Table output formatting for CLI commands
//!
//! Renders workspaces, overview rows, narratives, mentions, trend insights and
//! cache statistics using comfy-table.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{
    BrandDetail, BrandOverview, Mention, Momentum, Narrative, SentimentBreakdown, SentimentLabel,
    TrendInsight, Workspace,
};
use crate::services::transform::classify_sentiment;
use crate::services::CacheStats;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    pub fn format_workspaces(&self, workspaces: &[Workspace]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Name"]));

        for workspace in workspaces {
            table.add_row(vec![
                Cell::new(workspace.id),
                Cell::new(&workspace.name),
            ]);
        }

        table.to_string()
    }

    pub fn format_overview(&self, rows: &[BrandOverview]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&[
            "ID",
            "Brand",
            "Narratives",
            "Mentions",
            "Sentiment",
            "Risk",
            "+/=/-",
            "Top narrative",
        ]));

        for row in rows {
            table.add_row(vec![
                Cell::new(row.id),
                Cell::new(&row.name),
                Cell::new(row.narrative_count),
                Cell::new(row.total_mentions),
                self.sentiment_cell(row.avg_sentiment),
                self.risk_cell(row.risk_score),
                Cell::new(breakdown_text(&row.sentiment_breakdown)),
                Cell::new(truncate_text(row.top_narrative.as_deref().unwrap_or("-"), 40)),
            ]);
        }

        table.to_string()
    }

    pub fn format_detail(&self, detail: &BrandDetail) -> String {
        let summary = self.format_overview(std::slice::from_ref(&detail.overview));
        if detail.narratives.is_empty() {
            return summary;
        }
        format!("{summary}\n{}", self.format_narratives(&detail.narratives))
    }

    pub fn format_narratives(&self, narratives: &[Narrative]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Title", "Mentions", "Sentiment", "Risk", "Last seen"]));

        for narrative in narratives {
            table.add_row(vec![
                Cell::new(truncate_text(&narrative.id, 12)),
                Cell::new(truncate_text(&narrative.title, 50)),
                Cell::new(narrative.mention_count),
                self.label_cell(narrative.avg_sentiment, narrative.sentiment),
                self.risk_cell(narrative.risk_score),
                Cell::new(
                    narrative
                        .last_seen
                        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
                ),
            ]);
        }

        table.to_string()
    }

    pub fn format_mentions(&self, mentions: &[Mention]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Published", "Channel", "Source", "Sentiment", "Title"]));

        for mention in mentions {
            let title = mention
                .title
                .as_deref()
                .or(mention.snippet.as_deref())
                .unwrap_or("-");
            table.add_row(vec![
                Cell::new(
                    mention
                        .published_at
                        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
                ),
                Cell::new(mention.channel.as_deref().unwrap_or("-")),
                Cell::new(truncate_text(mention.source.as_deref().unwrap_or("-"), 24)),
                self.sentiment_cell(mention.sentiment),
                Cell::new(truncate_text(title, 60)),
            ]);
        }

        table.to_string()
    }

    pub fn format_trend(&self, insight: &TrendInsight) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Metric", "Value"]));

        let momentum = if self.use_colors {
            Cell::new(insight.momentum).fg(momentum_color(insight.momentum))
        } else {
            Cell::new(insight.momentum)
        };

        table.add_row(vec![Cell::new("Brand"), Cell::new(&insight.name)]);
        table.add_row(vec![Cell::new("Total mentions"), Cell::new(insight.total_mentions)]);
        table.add_row(vec![Cell::new("Last 24h"), Cell::new(insight.recent_24h)]);
        table.add_row(vec![Cell::new("Previous 24h"), Cell::new(insight.previous_24h)]);
        table.add_row(vec![
            Cell::new("Growth"),
            Cell::new(format!("{:+.1}%", insight.growth_rate)),
        ]);
        table.add_row(vec![
            Cell::new("Velocity"),
            Cell::new(format!("{:.1}/h", insight.velocity)),
        ]);
        table.add_row(vec![Cell::new("Momentum"), momentum]);
        table.add_row(vec![
            Cell::new("Half-life"),
            Cell::new(format!("{} days", insight.half_life_days)),
        ]);
        table.add_row(vec![
            Cell::new("Sentiment +/=/-"),
            Cell::new(breakdown_text(&insight.sentiment_breakdown)),
        ]);

        let channels = insight
            .channels
            .iter()
            .map(|(channel, count)| format!("{channel}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new("Channels"),
            Cell::new(if channels.is_empty() { "-".to_string() } else { channels }),
        ]);

        table.to_string()
    }

    pub fn format_stats(&self, stats: &CacheStats) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Counter", "Value"]));

        table.add_row(vec![Cell::new("Hits"), Cell::new(stats.hits)]);
        table.add_row(vec![Cell::new("Misses"), Cell::new(stats.misses)]);
        table.add_row(vec![Cell::new("Hit rate"), Cell::new(&stats.hit_rate)]);
        table.add_row(vec![Cell::new("Evictions"), Cell::new(stats.evictions)]);
        table.add_row(vec![Cell::new("Expired"), Cell::new(stats.expired)]);
        table.add_row(vec![
            Cell::new("Size"),
            Cell::new(format!("{}/{}", stats.size, stats.max_size)),
        ]);
        table.add_row(vec![Cell::new("Pending fetches"), Cell::new(stats.pending)]);

        table.to_string()
    }

    fn sentiment_cell(&self, value: f64) -> Cell {
        self.label_cell(value, classify_sentiment(value))
    }

    fn label_cell(&self, value: f64, label: SentimentLabel) -> Cell {
        let cell = Cell::new(format!("{value:.1}"));
        if self.use_colors {
            cell.fg(sentiment_color(label))
        } else {
            cell
        }
    }

    fn risk_cell(&self, risk: f64) -> Cell {
        let cell = Cell::new(format!("{risk:.1}"));
        if !self.use_colors {
            return cell;
        }
        if risk >= 60.0 {
            cell.fg(Color::Red).add_attribute(Attribute::Bold)
        } else if risk >= 30.0 {
            cell.fg(Color::Yellow)
        } else {
            cell
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

fn breakdown_text(breakdown: &SentimentBreakdown) -> String {
    format!(
        "{}/{}/{}",
        breakdown.positive, breakdown.neutral, breakdown.negative
    )
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn sentiment_color(label: SentimentLabel) -> Color {
    match label {
        SentimentLabel::Positive => Color::Green,
        SentimentLabel::Neutral => Color::DarkGrey,
        SentimentLabel::Negative => Color::Red,
    }
}

fn momentum_color(momentum: Momentum) -> Color {
    match momentum {
        Momentum::Accelerating => Color::Red,
        Momentum::Steady => Color::White,
        Momentum::Decelerating => Color::Green,
    }
}

/// Truncate text to max characters with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> TableFormatter {
        TableFormatter::with_config(false, Some(160))
    }

    #[test]
    fn test_truncate_text_is_char_safe() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_workspaces_table_lists_names() {
        let output = plain().format_workspaces(&[
            Workspace { id: 1, name: "Brand A".to_string() },
            Workspace { id: 2, name: "Brand B".to_string() },
        ]);
        assert!(output.contains("Brand A"));
        assert!(output.contains("Brand B"));
    }

    #[test]
    fn test_stats_table_shows_hit_rate() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            evictions: 0,
            expired: 0,
            size: 1,
            max_size: 500,
            pending: 0,
            hit_rate: "66.67%".to_string(),
        };
        let output = plain().format_stats(&stats);
        assert!(output.contains("66.67%"));
        assert!(output.contains("1/500"));
    }
}
