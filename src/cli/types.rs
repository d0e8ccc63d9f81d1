//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};

use crate::domain::models::{QueryOptions, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "brandpulse")]
#[command(about = "Brandpulse - cached, rate-limited brand metrics", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output the response envelope as JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this YAML file instead of .brandpulse/
    #[arg(short, long, global = true, env = "BRANDPULSE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tracked workspaces
    Workspaces,

    /// Overview row for every workspace
    Overview(QueryArgs),

    /// Overview plus narratives for one brand
    Detail(BrandArgs),

    /// Narratives for one brand
    Narratives(BrandArgs),

    /// Mentions for one brand
    Mentions(BrandArgs),

    /// Volume momentum and half-life for one brand
    Trends(BrandArgs),

    /// Load detail for the given brands, then report cache statistics
    Stats {
        /// Brand ids or names to load first
        brands: Vec<String>,

        /// Load each brand this many times
        #[arg(short, long, default_value = "2")]
        repeat: u32,
    },
}

#[derive(Args, Debug)]
pub struct BrandArgs {
    /// Workspace id or brand name (case-insensitive)
    pub brand: String,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub struct QueryArgs {
    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Sort order: risk, mentions, sentiment or recent
    #[arg(short, long)]
    pub sort: Option<SortOrder>,

    /// Window start: RFC 3339 timestamp or relative age like 24h, 7d
    #[arg(long, value_parser = parse_time_arg)]
    pub since: Option<DateTime<Utc>>,

    /// Window end: RFC 3339 timestamp or relative age like 1h
    #[arg(long, value_parser = parse_time_arg)]
    pub to: Option<DateTime<Utc>>,

    /// Drop rows with sentiment below this value
    #[arg(long, allow_negative_numbers = true)]
    pub sentiment_min: Option<f64>,

    /// Drop rows with sentiment above this value
    #[arg(long, allow_negative_numbers = true)]
    pub sentiment_max: Option<f64>,

    /// Restrict to one channel (news, social, ...)
    #[arg(long)]
    pub channel: Option<String>,
}

impl From<&QueryArgs> for QueryOptions {
    fn from(args: &QueryArgs) -> Self {
        Self {
            limit: args.limit,
            sort: args.sort,
            since: args.since,
            to: args.to,
            sentiment_min: args.sentiment_min,
            sentiment_max: args.sentiment_max,
            channel: args.channel.clone(),
        }
    }
}

/// Parse an absolute RFC 3339 timestamp or a relative age (`30m`, `24h`, `7d`).
pub fn parse_time_arg(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    let Some((split, _)) = value.char_indices().last() else {
        return Err("empty time value".to_string());
    };
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid time '{value}': expected RFC 3339 or an age like 24h"))?;

    let age = match unit {
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => return Err(format!("invalid time unit in '{value}': use m, h or d")),
    };
    age.and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| format!("time '{value}' is out of range"))
}
