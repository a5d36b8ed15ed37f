//! Pipeline sequencing
//!
//! A stage is a plain function that reads the fixtures produced so far,
//! performs its calls through the [`Harness`], and hands back the fixtures
//! it created. Missing preconditions surface as [`Interrupt::Skip`], hard
//! errors as [`Interrupt::Abort`]; the [`Sequencer`] decides what happens
//! next.

use std::fmt;
use tracing::{info, warn};

use crate::assertions::Recorder;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::fixtures::{FixtureDelta, Fixtures, Skipped};
use crate::groups;
use crate::session::{ApiRequest, ApiResponse, Session};

/// Test groups in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Health,
    Auth,
    Courses,
    Enrollments,
    Progress,
    Modules,
    Quizzes,
    Attempts,
    LearningProgress,
    AccessControl,
    Cleanup,
}

impl Group {
    pub const ALL: [Group; 11] = [
        Group::Health,
        Group::Auth,
        Group::Courses,
        Group::Enrollments,
        Group::Progress,
        Group::Modules,
        Group::Quizzes,
        Group::Attempts,
        Group::LearningProgress,
        Group::AccessControl,
        Group::Cleanup,
    ];

    /// Short identifier used on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Group::Health => "health",
            Group::Auth => "auth",
            Group::Courses => "courses",
            Group::Enrollments => "enrollments",
            Group::Progress => "progress",
            Group::Modules => "modules",
            Group::Quizzes => "quizzes",
            Group::Attempts => "attempts",
            Group::LearningProgress => "learning-progress",
            Group::AccessControl => "access-control",
            Group::Cleanup => "cleanup",
        }
    }

    pub fn from_key(key: &str) -> Option<Group> {
        Group::ALL.into_iter().find(|g| g.key() == key)
    }

    fn banner(&self) -> &'static str {
        match self {
            Group::Health => "🏥 Health Check",
            Group::Auth => "🔐 Testing Authentication APIs...",
            Group::Courses => "📚 Testing Course APIs...",
            Group::Enrollments => "📝 Testing Enrollment APIs...",
            Group::Progress => "📊 Testing Progress APIs...",
            Group::Modules => "🧩 Testing Module & Lesson APIs...",
            Group::Quizzes => "❓ Testing Quiz Authoring APIs...",
            Group::Attempts => "🎯 Testing Quiz Attempt Workflow...",
            Group::LearningProgress => "📈 Testing Learning Progress APIs...",
            Group::AccessControl => "🔒 Testing Access Control...",
            Group::Cleanup => "🧹 Cleaning up test data...",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Why a stage stopped early
#[derive(Debug)]
pub enum Interrupt {
    /// A precondition fixture is missing; not a failure
    Skip(Skipped),
    /// Unexpected error; stops the whole run
    Abort(ProbeError),
}

impl From<Skipped> for Interrupt {
    fn from(skipped: Skipped) -> Self {
        Interrupt::Skip(skipped)
    }
}

impl From<ProbeError> for Interrupt {
    fn from(err: ProbeError) -> Self {
        Interrupt::Abort(err)
    }
}

impl From<serde_json::Error> for Interrupt {
    fn from(err: serde_json::Error) -> Self {
        Interrupt::Abort(ProbeError::Json(err))
    }
}

pub type StageResult = Result<FixtureDelta, Interrupt>;

pub type StageFn = fn(&mut Harness, &Fixtures) -> StageResult;

/// One named step of the pipeline
#[derive(Clone, Copy)]
pub struct Stage {
    pub group: Group,
    pub name: &'static str,
    pub run: StageFn,
}

impl Stage {
    pub const fn new(group: Group, name: &'static str, run: StageFn) -> Self {
        Self { group, name, run }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("group", &self.group)
            .field("name", &self.name)
            .finish()
    }
}

/// Everything a stage may touch besides the fixtures
pub struct Harness {
    session: Session,
    recorder: Recorder,
    config: ProbeConfig,
    run_id: String,
}

impl Harness {
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        let session = Session::new(&config)?;
        let run_id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        Ok(Self {
            session,
            recorder: Recorder::new(),
            config,
            run_id,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Unique token for this run, used to build fresh identities
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Perform a call without asserting on it.
    ///
    /// The outer error is a hard error (the request could not be built);
    /// the inner one is a transport failure the caller decides about.
    pub fn send(&mut self, request: ApiRequest) -> ProbeResult<ProbeResult<ApiResponse>> {
        let url = self.session.url(&request.path)?;
        Ok(self.session.execute(url, &request))
    }

    /// Perform a call and assert its status; the response is returned only on a pass
    pub fn expect(
        &mut self,
        name: &str,
        expected: u16,
        request: ApiRequest,
    ) -> ProbeResult<Option<ApiResponse>> {
        self.expect_in(name, &[expected], request)
    }

    pub fn expect_in(
        &mut self,
        name: &str,
        expected: &[u16],
        request: ApiRequest,
    ) -> ProbeResult<Option<ApiResponse>> {
        let outcome = self.send(request)?;
        if self.recorder.expect_status_in(name, &outcome, expected) {
            Ok(outcome.ok())
        } else {
            Ok(None)
        }
    }

    pub fn check(&mut self, name: &str, ok: bool, detail: impl FnOnce() -> String) -> bool {
        self.recorder.check(name, ok, detail)
    }

    /// Assert that every JSON pointer resolves to a non-null value
    pub fn require_fields(&mut self, name: &str, resp: &ApiResponse, pointers: &[&str]) -> bool {
        if resp.json().is_err() {
            self.recorder.fail(
                name,
                "response body is not valid JSON",
                Some(resp.excerpt(crate::assertions::EXCERPT_LEN)),
            );
            return false;
        }

        let missing: Vec<&str> = pointers.iter().copied().filter(|p| !resp.has(p)).collect();
        self.recorder.check(name, missing.is_empty(), || {
            format!("missing field(s) {}", missing.join(", "))
        })
    }

    /// Record a skipped sub-step inside a stage that otherwise ran
    pub fn skip(&mut self, name: &str, skipped: &Skipped) {
        self.recorder.skip(name, skipped);
    }

    pub fn into_recorder(self) -> Recorder {
        self.recorder
    }
}

/// Runs stages in order, applying deltas and enforcing soft/hard stop rules
#[derive(Debug, Clone)]
pub struct Sequencer {
    stages: Vec<Stage>,
}

impl Sequencer {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The full LMS pipeline
    pub fn standard() -> Self {
        Self::new(groups::pipeline())
    }

    /// Drop every stage of `group`
    pub fn without(mut self, group: Group) -> Self {
        self.stages.retain(|s| s.group != group);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn run(&self, harness: &mut Harness) -> Fixtures {
        let mut fixtures = Fixtures::new();
        let mut current: Option<Group> = None;

        for (index, stage) in self.stages.iter().enumerate() {
            if current != Some(stage.group) {
                info!("");
                info!("{}", stage.group.banner());
                current = Some(stage.group);
            }

            match (stage.run)(harness, &fixtures) {
                Ok(delta) => {
                    fixtures.apply(delta);
                }
                Err(Interrupt::Skip(skipped)) => {
                    harness.recorder.skip(stage.name, &skipped);
                }
                Err(Interrupt::Abort(err)) => {
                    harness.recorder.abort(stage.name, &err);
                    let remaining = self.stages.len() - index - 1;
                    if remaining > 0 {
                        warn!("Run aborted, {} remaining stage(s) not executed", remaining);
                    }
                    break;
                }
            }
        }

        fixtures
    }
}
