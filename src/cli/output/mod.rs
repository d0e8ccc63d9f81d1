//! Output formatting utilities for the CLI.

pub mod table;

use serde::Serialize;

use crate::domain::models::{
    BrandDetail, BrandOverview, Mention, Narrative, ResponseEnvelope, TrendInsight, Workspace,
};
use crate::services::CacheStats;

pub use table::TableFormatter;

/// Payloads that know how to render themselves for humans.
pub trait CommandOutput: Serialize {
    fn to_human(&self, formatter: &TableFormatter) -> String;
}

impl CommandOutput for Vec<Workspace> {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_workspaces(self)
    }
}

impl CommandOutput for Vec<BrandOverview> {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_overview(self)
    }
}

impl CommandOutput for BrandDetail {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_detail(self)
    }
}

impl CommandOutput for Vec<Narrative> {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_narratives(self)
    }
}

impl CommandOutput for Vec<Mention> {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_mentions(self)
    }
}

impl CommandOutput for TrendInsight {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_trend(self)
    }
}

impl CommandOutput for CacheStats {
    fn to_human(&self, formatter: &TableFormatter) -> String {
        formatter.format_stats(self)
    }
}

/// Print an envelope and report whether it carried data.
///
/// JSON mode prints the envelope verbatim, errors included, so scripts see
/// the same shape in every case. Human mode prints a table or the error.
pub fn output<T: CommandOutput>(envelope: &ResponseEnvelope<T>, json_mode: bool) -> bool {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(envelope).unwrap_or_default()
        );
        return envelope.is_ok();
    }

    match (&envelope.data, &envelope.error) {
        (_, Some(error)) => {
            eprintln!("Error [{}]: {}", error.code, error.message);
            if let Some(details) = &error.details {
                eprintln!("  {details}");
            }
            false
        }
        (Some(data), None) => {
            println!("{}", data.to_human(&TableFormatter::new()));
            if envelope.cached {
                println!("(served from cache)");
            }
            true
        }
        (None, None) => true,
    }
}
