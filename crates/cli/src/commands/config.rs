//! Configuration Commands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use lmsprobe_e2e::ProbeConfig;

use crate::output::print_success;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a configuration file populated with the defaults
    Init {
        /// Destination file
        #[arg(default_value = "lmsprobe.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a configuration file
    Check {
        /// Configuration file
        path: PathBuf,
    },
}

pub fn execute(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            write_default(&path, force)?;
            print_success(&format!("Wrote default configuration to {}", path.display()));
        }
        ConfigCommands::Check { path } => {
            let config = ProbeConfig::load(&path)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            print_success(&format!(
                "{} is valid (API root {})",
                path.display(),
                config.api_base()
            ));
        }
    }
    Ok(())
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = toml::to_string_pretty(&ProbeConfig::default())
        .context("Failed to serialize default configuration")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
