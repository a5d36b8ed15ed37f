//! Run Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use lmsprobe_e2e::{Group, Orchestrator, ProbeConfig};

use crate::output::print_warning;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML configuration file; built-in defaults apply when omitted
    #[arg(short, long, env = "LMSPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server root, e.g. http://localhost:8001
    #[arg(long, env = "LMSPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Administrator email
    #[arg(long, env = "LMSPROBE_ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Administrator password
    #[arg(long, env = "LMSPROBE_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Learner email
    #[arg(long, env = "LMSPROBE_USER_EMAIL")]
    pub user_email: Option<String>,

    /// Learner password
    #[arg(long, env = "LMSPROBE_USER_PASSWORD", hide_env_values = true)]
    pub user_password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Wait up to this many seconds for /health before starting
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    /// Skip a test group (repeatable)
    #[arg(long = "skip", value_name = "GROUP", value_parser = parse_group)]
    pub skip: Vec<Group>,

    /// Leave created entities on the server
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Skip the forgot/verify/reset password flow
    #[arg(long)]
    pub no_password_reset: bool,

    /// Also write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

pub(crate) fn parse_group(value: &str) -> Result<Group, String> {
    Group::from_key(value).ok_or_else(|| {
        let known: Vec<&str> = Group::ALL.iter().map(|g| g.key()).collect();
        format!("unknown group '{}' (expected one of: {})", value, known.join(", "))
    })
}

impl RunArgs {
    /// File configuration with command-line overrides applied on top
    pub fn resolve_config(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ProbeConfig::default(),
        };

        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(email) = &self.admin_email {
            config.admin.email = email.clone();
        }
        if let Some(password) = &self.admin_password {
            config.admin.password = password.clone();
        }
        if let Some(email) = &self.user_email {
            config.user.email = email.clone();
        }
        if let Some(password) = &self.user_password {
            config.user.password = password.clone();
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        if self.no_password_reset {
            config.password_reset.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn skipped_groups(&self) -> Vec<Group> {
        let mut groups = self.skip.clone();
        if self.skip_cleanup && !groups.contains(&Group::Cleanup) {
            groups.push(Group::Cleanup);
        }
        groups
    }
}

/// Run the pipeline; returns whether every check passed
pub fn execute(args: RunArgs) -> Result<bool> {
    let config = args.resolve_config()?;
    let mut orchestrator = Orchestrator::new(config)?;

    for group in args.skipped_groups() {
        info!("Skipping group: {}", group);
        orchestrator = orchestrator.skip_group(group);
    }
    if args.skip_cleanup {
        print_warning("Cleanup disabled, test entities will remain on the server");
    }

    if let Some(secs) = args.wait {
        orchestrator
            .wait_until_healthy(Duration::from_secs(secs))
            .context("Server did not become healthy")?;
    }

    let report = orchestrator.run();
    report.print();

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(report.success())
}
