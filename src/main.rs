//! Brandpulse CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use brandpulse::cli::{commands, handle_error, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match commands::execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            handle_error(&err, json);
            ExitCode::FAILURE
        }
    }
}
