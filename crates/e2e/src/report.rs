//! End-of-run summary

use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::assertions::{Abort, Failure, Recorder, Skip};
use crate::error::ProbeResult;

/// Outcome of one run, serializable for `--report`
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
    pub skips: Vec<Skip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<Abort>,
}

impl SuiteReport {
    pub fn from_recorder(
        recorder: &Recorder,
        run_id: &str,
        base_url: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            started_at,
            duration_ms,
            base_url: base_url.to_string(),
            total: recorder.passed() + recorder.failed(),
            passed: recorder.passed(),
            failed: recorder.failed(),
            skipped: recorder.skipped(),
            failures: recorder.failures().to_vec(),
            skips: recorder.skips().to_vec(),
            aborted: recorder.aborted().cloned(),
        }
    }

    /// True iff nothing failed; skips do not count
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = Vec::new();

        out.push(rule.clone());
        out.push("TEST RESULTS SUMMARY".bold().to_string());
        out.push(rule.clone());

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Total", "Passed", "Failed", "Skipped", "Duration"]);
        table.add_row(vec![
            Cell::new(self.total),
            Cell::new(self.passed),
            Cell::new(self.failed),
            Cell::new(self.skipped),
            Cell::new(format!("{} ms", self.duration_ms)),
        ]);
        out.push(table.to_string());

        if let Some(abort) = &self.aborted {
            out.push(String::new());
            out.push(format!("{} {}: {}", "RUN ABORTED in".red().bold(), abort.stage, abort.error));
        }

        if !self.failures.is_empty() {
            out.push(String::new());
            out.push("FAILED TESTS:".red().bold().to_string());
            for failure in &self.failures {
                out.push(format!("  - {}", failure.message));
            }
        }

        if !self.skips.is_empty() {
            out.push(String::new());
            out.push("SKIPPED:".yellow().bold().to_string());
            for skip in &self.skips {
                out.push(format!("  - {} (missing {})", skip.name, skip.missing));
            }
        }

        out.push(String::new());
        if self.success() {
            out.push("🎉 ALL TESTS PASSED!".green().bold().to_string());
        } else {
            out.push(format!("⚠️  {} TESTS FAILED", self.failed).red().bold().to_string());
        }

        out.join("\n")
    }

    pub fn print(&self) {
        println!();
        println!("{}", self.render());
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> ProbeResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Report written to: {}", path.display());
        Ok(())
    }
}
