//! lmsprobe CLI
//!
//! Command-line interface for running the LMS contract checks against a
//! live server, inspecting the pipeline and managing configuration files.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

use commands::{config, run, stages};

/// lmsprobe - end-to-end contract checks for an LMS backend
#[derive(Parser, Debug)]
#[command(name = "lmsprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format for listings
    #[arg(long, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline against a server
    Run(run::RunArgs),

    /// List pipeline stages in execution order
    Stages(stages::StagesArgs),

    /// Manage configuration files
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show version information
    Version,
}

/// Outcome of a command, mapped to the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ChecksFailed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::ChecksFailed => 1,
        }
    }
}

pub fn execute(cli: Cli) -> Result<Outcome> {
    match cli.command {
        Commands::Run(args) => {
            if run::execute(args)? {
                Ok(Outcome::Success)
            } else {
                Ok(Outcome::ChecksFailed)
            }
        }
        Commands::Stages(args) => {
            stages::execute(args, cli.format);
            Ok(Outcome::Success)
        }
        Commands::Config(cmd) => {
            config::execute(cmd)?;
            Ok(Outcome::Success)
        }
        Commands::Version => {
            println!("lmsprobe v{}", env!("CARGO_PKG_VERSION"));
            Ok(Outcome::Success)
        }
    }
}
