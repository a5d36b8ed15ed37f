//! lmsprobe CLI - Main Entry Point

use clap::Parser;
use std::process::ExitCode;

use lmsprobe_cli::{execute, output, Cli};

/// Exit status for configuration and startup errors
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match execute(cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(EXIT_ERROR)
        }
    }
}
