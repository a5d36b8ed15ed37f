//! Run-scoped fixture registry
//!
//! Values produced by one stage and consumed by later ones: bearer tokens,
//! password-reset secrets, and handles of the entities the run created.
//! Stages never write here directly. They return a [`FixtureDelta`] which
//! the sequencer applies once the stage has finished, and every slot can be
//! filled at most once per run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::config::{Credentials, ProbeConfig};
use crate::scoring::AnswerTally;

/// Account role a token was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Opaque bearer credential tagged with the role it carries
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    role: Role,
    value: String,
}

impl AuthToken {
    pub fn new(role: Role, value: impl Into<String>) -> Self {
        Self {
            role,
            value: value.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({}, <redacted>)", self.role)
    }
}

/// Server-side objects the run creates and later deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Course,
    Module,
    Lesson,
    Quiz,
    Enrollment,
    Attempt,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Course => "course",
            Entity::Module => "module",
            Entity::Lesson => "lesson",
            Entity::Quiz => "quiz",
            Entity::Enrollment => "enrollment",
            Entity::Attempt => "quiz attempt",
        };
        write!(f, "{}", name)
    }
}

/// A created quiz question together with answers whose correctness is known
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionHandle {
    pub id: String,
    pub correct_answer: String,
    pub wrong_answer: String,
}

/// Account registered by the signup checks
#[derive(Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password: String,
    pub token: AuthToken,
}

impl Account {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Outcome of the first graded quiz attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub attempt_id: String,
    pub score: f64,
    /// The server's own verdict, when it reports one
    pub passed: Option<bool>,
    pub tally: AnswerTally,
}

/// One value produced by a stage
#[derive(Debug, Clone)]
pub enum Fixture {
    Token(AuthToken),
    SignupAccount(Account),
    Otp(String),
    ResetToken(String),
    UserPassword(String),
    Entity(Entity, String),
    Question(QuestionHandle),
    Submission(Submission),
}

/// Fixtures a stage hands back to the sequencer
#[derive(Debug, Default)]
pub struct FixtureDelta(Vec<Fixture>);

impl FixtureDelta {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, fixture: Fixture) -> Self {
        self.0.push(fixture);
        self
    }

    pub fn push(&mut self, fixture: Fixture) {
        self.0.push(fixture);
    }
}

impl From<Fixture> for FixtureDelta {
    fn from(fixture: Fixture) -> Self {
        Self(vec![fixture])
    }
}

/// A precondition a stage needed but the run never produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub missing: String,
}

impl Skipped {
    pub fn missing(what: impl Into<String>) -> Self {
        Self {
            missing: what.into(),
        }
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing {}", self.missing)
    }
}

/// Progress through forgot-password → verify-otp → reset-password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    NoOtp,
    OtpIssued,
    ResetTokenIssued,
    PasswordChanged,
}

/// Progress of the graded quiz attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Default)]
pub struct Fixtures {
    tokens: BTreeMap<Role, AuthToken>,
    signup: Option<Account>,
    otp: Option<String>,
    reset_token: Option<String>,
    user_password: Option<String>,
    entities: BTreeMap<Entity, String>,
    questions: Vec<QuestionHandle>,
    submission: Option<Submission>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a stage's delta, returning how many fixtures were accepted.
    /// Values for slots that are already filled are dropped with a warning.
    pub fn apply(&mut self, delta: FixtureDelta) -> usize {
        let mut accepted = 0;
        for fixture in delta.0 {
            let applied = match fixture {
                Fixture::Token(token) => {
                    let role = token.role();
                    if self.tokens.contains_key(&role) {
                        false
                    } else {
                        self.tokens.insert(role, token);
                        true
                    }
                }
                Fixture::SignupAccount(account) => set_once(&mut self.signup, account),
                Fixture::Otp(otp) => set_once(&mut self.otp, otp),
                Fixture::ResetToken(token) => set_once(&mut self.reset_token, token),
                Fixture::UserPassword(password) => set_once(&mut self.user_password, password),
                Fixture::Entity(entity, id) => {
                    if self.entities.contains_key(&entity) {
                        false
                    } else {
                        debug!("Registered {} {}", entity, id);
                        self.entities.insert(entity, id);
                        true
                    }
                }
                Fixture::Question(question) => {
                    if self.questions.iter().any(|q| q.id == question.id) {
                        false
                    } else {
                        self.questions.push(question);
                        true
                    }
                }
                Fixture::Submission(submission) => set_once(&mut self.submission, submission),
            };

            if applied {
                accepted += 1;
            } else {
                warn!("Fixture already set, keeping the first value");
            }
        }
        accepted
    }

    pub fn token(&self, role: Role) -> Result<&AuthToken, Skipped> {
        self.tokens
            .get(&role)
            .ok_or_else(|| Skipped::missing(format!("{} token", role)))
    }

    pub fn signup_account(&self) -> Result<&Account, Skipped> {
        self.signup
            .as_ref()
            .ok_or_else(|| Skipped::missing("signup account"))
    }

    pub fn otp(&self) -> Result<&str, Skipped> {
        self.otp.as_deref().ok_or_else(|| Skipped::missing("OTP"))
    }

    pub fn reset_token(&self) -> Result<&str, Skipped> {
        self.reset_token
            .as_deref()
            .ok_or_else(|| Skipped::missing("reset token"))
    }

    pub fn entity(&self, entity: Entity) -> Result<&str, Skipped> {
        self.entities
            .get(&entity)
            .map(String::as_str)
            .ok_or_else(|| Skipped::missing(format!("{} id", entity)))
    }

    /// Entity id, or `placeholder` when it was never created
    pub fn entity_or<'a>(&'a self, entity: Entity, placeholder: &'a str) -> &'a str {
        self.entities
            .get(&entity)
            .map(String::as_str)
            .unwrap_or(placeholder)
    }

    pub fn questions(&self) -> Result<&[QuestionHandle], Skipped> {
        if self.questions.is_empty() {
            Err(Skipped::missing("quiz questions"))
        } else {
            Ok(&self.questions)
        }
    }

    pub fn submission(&self) -> Result<&Submission, Skipped> {
        self.submission
            .as_ref()
            .ok_or_else(|| Skipped::missing("quiz submission"))
    }

    /// Learner password, reflecting a completed password reset
    pub fn user_password<'a>(&'a self, config: &'a ProbeConfig) -> &'a str {
        self.user_password
            .as_deref()
            .unwrap_or(config.user.password.as_str())
    }

    pub fn user_credentials(&self, config: &ProbeConfig) -> Credentials {
        Credentials::new(config.user.email.clone(), self.user_password(config))
    }

    pub fn reset_state(&self) -> ResetState {
        if self.user_password.is_some() {
            ResetState::PasswordChanged
        } else if self.reset_token.is_some() {
            ResetState::ResetTokenIssued
        } else if self.otp.is_some() {
            ResetState::OtpIssued
        } else {
            ResetState::NoOtp
        }
    }

    pub fn attempt_state(&self) -> AttemptState {
        if self.submission.is_some() {
            AttemptState::Submitted
        } else if self.entities.contains_key(&Entity::Attempt) {
            AttemptState::InProgress
        } else {
            AttemptState::NotStarted
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}
