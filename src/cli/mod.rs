//! Command-line interface
//!
//! clap definitions in [`types`], handlers in [`commands`] and table/JSON
//! rendering in [`output`].

pub mod commands;
pub mod output;
pub mod types;

pub use types::{BrandArgs, Cli, Commands, QueryArgs};

/// Report an error that prevented a command from running at all.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({
            "data": null,
            "error": {
                "code": "CLI_ERROR",
                "message": format!("{err:#}"),
            },
            "cached": false,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
}
