//! lmsprobe E2E harness
//!
//! Drives a running LMS backend through its HTTP API in one fixed,
//! sequential pipeline and reports every contract violation:
//! - Authentication, including the password-reset flow
//! - Course, enrollment, progress, module and lesson management
//! - Quiz authoring, attempts, score verification and the attempt limit
//! - Role-based access control on admin routes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Orchestrator (runner)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Sequencer                                                  │
//! │    ├── Stage fn(&mut Harness, &Fixtures) -> StageResult     │
//! │    │     ├── Ok(FixtureDelta)   applied to the registry     │
//! │    │     ├── Skip(Skipped)      missing precondition        │
//! │    │     └── Abort(ProbeError)  stops the run               │
//! │    └── groups: health → auth → … → access → cleanup         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Harness                                                    │
//! │    ├── Session   (blocking reqwest client, cookie store)    │
//! │    └── Recorder  (passes, failures, skips, abort)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteReport     summary table, JSON file, exit status      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod config;
pub mod error;
pub mod fixtures;
mod groups;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod session;

pub use assertions::Recorder;
pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use fixtures::Fixtures;
pub use pipeline::{Group, Harness, Sequencer, Stage};
pub use report::SuiteReport;
pub use runner::Orchestrator;
