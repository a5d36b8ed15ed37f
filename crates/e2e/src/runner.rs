//! Top-level runner: waits for the server, runs the pipeline, builds the report

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::ProbeConfig;
use crate::error::ProbeResult;
use crate::pipeline::{Group, Harness, Sequencer};
use crate::report::SuiteReport;

pub struct Orchestrator {
    harness: Harness,
    sequencer: Sequencer,
}

impl Orchestrator {
    /// Runner over the full pipeline
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        Ok(Self {
            harness: Harness::new(config)?,
            sequencer: Sequencer::standard(),
        })
    }

    /// Replace the pipeline, e.g. with a trimmed or custom one
    pub fn with_sequencer(mut self, sequencer: Sequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn skip_group(mut self, group: Group) -> Self {
        self.sequencer = self.sequencer.without(group);
        self
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Block until `GET /health` answers 200, for freshly started servers
    pub fn wait_until_healthy(&self, timeout: Duration) -> ProbeResult<()> {
        self.harness.session().wait_until_healthy(timeout)
    }

    pub fn run(self) -> SuiteReport {
        let Self {
            mut harness,
            sequencer,
        } = self;

        let base_url = harness.session().base().to_string();
        info!("🚀 Starting LMS API tests against {}", base_url);
        info!("Run id: {} ({} stages)", harness.run_id(), sequencer.stages().len());

        let started_at = Utc::now();
        let start = Instant::now();
        sequencer.run(&mut harness);
        let duration_ms = start.elapsed().as_millis() as u64;

        let run_id = harness.run_id().to_string();
        let recorder = harness.into_recorder();
        SuiteReport::from_recorder(&recorder, &run_id, &base_url, started_at, duration_ms)
    }
}
