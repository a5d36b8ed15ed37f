//! Assertion engine and result accumulator
//!
//! Every check lands here: a pass increments a counter, a failure appends a
//! structured record, and nothing in this module can panic on a bad
//! response. Transport errors are failures like any other.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::fixtures::Skipped;
use crate::session::ApiResponse;

/// Maximum body characters kept with a failure record
pub const EXCERPT_LEN: usize = 200;

/// A failed check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// A step that did not run because a precondition was missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skip {
    pub name: String,
    pub missing: String,
}

/// The stage that stopped the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Abort {
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct Recorder {
    passed: usize,
    failures: Vec<Failure>,
    skips: Vec<Skip>,
    abort: Option<Abort>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a call completed with exactly `expected`
    pub fn expect_status(
        &mut self,
        name: &str,
        outcome: &ProbeResult<ApiResponse>,
        expected: u16,
    ) -> bool {
        self.expect_status_in(name, outcome, &[expected])
    }

    /// Check that a call completed with any of `expected`
    pub fn expect_status_in(
        &mut self,
        name: &str,
        outcome: &ProbeResult<ApiResponse>,
        expected: &[u16],
    ) -> bool {
        match outcome {
            Ok(resp) if expected.contains(&resp.status) => {
                self.pass(name, &format!("Status: {}", resp.status));
                true
            }
            Ok(resp) => {
                let expected = describe_expected(expected);
                error!("❌ {} - Expected: {}, Got: {}", name, expected, resp.status);
                let excerpt = resp.excerpt(EXCERPT_LEN);
                error!("Response: {}", excerpt);
                self.failures.push(Failure {
                    name: name.to_string(),
                    message: format!("{}: expected {}, got {}", name, expected, resp.status),
                    excerpt: Some(excerpt),
                });
                false
            }
            Err(e) => {
                error!("❌ {} - Exception: {}", name, e);
                self.failures.push(Failure {
                    name: name.to_string(),
                    message: format!("{}: exception - {}", name, e),
                    excerpt: None,
                });
                false
            }
        }
    }

    /// Record an arbitrary condition; `detail` is only built on failure
    pub fn check(&mut self, name: &str, ok: bool, detail: impl FnOnce() -> String) -> bool {
        if ok {
            self.pass(name, "OK");
        } else {
            self.fail(name, detail(), None);
        }
        ok
    }

    pub fn pass(&mut self, name: &str, detail: &str) {
        info!("✅ {} - {}", name, detail);
        self.passed += 1;
    }

    pub fn fail(&mut self, name: &str, reason: impl Into<String>, excerpt: Option<String>) {
        let reason = reason.into();
        error!("❌ {} - {}", name, reason);
        self.failures.push(Failure {
            name: name.to_string(),
            message: format!("{}: {}", name, reason),
            excerpt,
        });
    }

    /// Record a soft-skip; it never counts as a failure
    pub fn skip(&mut self, name: &str, skipped: &Skipped) {
        warn!("⏭️  {} - skipped, {}", name, skipped);
        self.skips.push(Skip {
            name: name.to_string(),
            missing: skipped.missing.clone(),
        });
    }

    /// Record the error that stops the run; counts as one failure
    pub fn abort(&mut self, stage: &str, err: &ProbeError) {
        error!("❌ {} - aborted: {}", stage, err);
        self.failures.push(Failure {
            name: stage.to_string(),
            message: format!("{}: aborted - {}", stage, err),
            excerpt: None,
        });
        self.abort = Some(Abort {
            stage: stage.to_string(),
            error: err.to_string(),
        });
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn skipped(&self) -> usize {
        self.skips.len()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn skips(&self) -> &[Skip] {
        &self.skips
    }

    pub fn aborted(&self) -> Option<&Abort> {
        self.abort.as_ref()
    }
}

fn describe_expected(expected: &[u16]) -> String {
    expected
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}
