//! CLI command implementations.
//!
//! `execute` is the process entry point: it loads configuration, installs
//! logging, constructs the one `DataService` for this process and hands it
//! by reference to the command handlers.

pub mod query;
pub mod stats;

use anyhow::Result;
use tracing::debug;

use crate::cli::types::{Cli, Commands};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;
use crate::services::DataService;

/// Run one CLI invocation. Returns `false` when the command reported an
/// error envelope.
pub async fn execute(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    let service = DataService::from_config(&config);
    run(&service, &config, cli.command, cli.json).await
}

/// Dispatch a command against an already constructed service.
pub async fn run(service: &DataService, config: &Config, command: Commands, json: bool) -> Result<bool> {
    let pruner = config.cache.prune_interval().map(|interval| {
        debug!(interval_secs = interval.as_secs(), "starting cache pruner");
        service.start_pruner(interval)
    });

    let succeeded = match command {
        Commands::Workspaces => query::workspaces(service, json).await,
        Commands::Overview(args) => query::overview(service, &args, json).await,
        Commands::Detail(args) => query::detail(service, &args, json).await,
        Commands::Narratives(args) => query::narratives(service, &args, json).await,
        Commands::Mentions(args) => query::mentions(service, &args, json).await,
        Commands::Trends(args) => query::trends(service, &args, json).await,
        Commands::Stats { brands, repeat } => stats::execute(service, &brands, repeat, json).await,
    };

    if let Some(pruner) = pruner {
        pruner.stop().await;
    }

    Ok(succeeded)
}
