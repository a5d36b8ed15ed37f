//! Probe configuration
//!
//! Every section has defaults matching a local development backend, so an
//! empty TOML file (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;

use crate::error::{ProbeError, ProbeResult};

/// Top-level probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Server root, without the API prefix
    pub base_url: String,

    /// Path prefix every API route lives under
    pub api_prefix: String,

    /// Per-request timeout; the HTTP client default applies when unset
    pub timeout_secs: Option<u64>,

    /// Pre-provisioned administrator account
    pub admin: Credentials,

    /// Pre-provisioned learner account
    pub user: Credentials,

    /// Fresh account created by the signup checks
    pub signup: SignupConfig,

    /// Forgot/verify/reset password flow
    pub password_reset: PasswordResetConfig,

    /// Course created by the course checks
    pub course: CourseTemplate,

    /// Quiz authoring and attempt settings
    pub quiz: QuizConfig,

    /// Expected behaviour that differs between server deployments
    pub expectations: Expectations,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: None,
            admin: Credentials::new("admin@example.com", "your_admin_password"),
            user: Credentials::new("testuser@example.com", "TestPassword123"),
            signup: SignupConfig::default(),
            password_reset: PasswordResetConfig::default(),
            course: CourseTemplate::default(),
            quiz: QuizConfig::default(),
            expectations: Expectations::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml(content: &str) -> ProbeResult<Self> {
        let config: ProbeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProbeResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ProbeError::Config("base_url must not be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProbeError::Config(format!(
                "base_url must use http or https: {}",
                base
            )));
        }
        if self.quiz.max_attempts == 0 {
            return Err(ProbeError::Config("quiz.max_attempts must be at least 1".to_string()));
        }
        if self.expectations.score_tolerance < 0.0 {
            return Err(ProbeError::Config(
                "expectations.score_tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute API root with a trailing slash, e.g. `http://host:8001/api/`
    pub fn api_base(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let prefix = self.api_prefix.trim().trim_matches('/');
        if prefix.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, prefix)
        }
    }
}

/// Email/password pair
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn body(&self) -> Value {
        json!({ "email": self.email, "password": self.password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupConfig {
    /// Local part prefix; a unique suffix is appended per run
    pub email_prefix: String,
    pub email_domain: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            email_prefix: "testuser".to_string(),
            email_domain: "example.com".to_string(),
            password: "TestPassword123".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfig {
    /// Disable on servers that rate-limit the OTP endpoints
    pub enabled: bool,

    /// Password set on the learner account by a successful reset
    pub new_password: String,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            new_password: "NewTestPassword123".to_string(),
        }
    }
}

/// Course body posted by the admin create check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseTemplate {
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub category: String,
    pub instructor: String,
    pub duration: String,
    pub difficulty: String,
    pub language: String,
    pub price: u32,
    pub currency: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub what_you_learn: Vec<String>,
}

impl Default for CourseTemplate {
    fn default() -> Self {
        Self {
            title: "Test Course for API Testing".to_string(),
            description: "A comprehensive test course for API validation".to_string(),
            short_description: "Test course for backend API testing".to_string(),
            category: "Technology".to_string(),
            instructor: "Test Instructor".to_string(),
            duration: "4 weeks".to_string(),
            difficulty: "beginner".to_string(),
            language: "English".to_string(),
            price: 999,
            currency: "INR".to_string(),
            is_published: true,
            is_featured: false,
            tags: vec!["testing".to_string(), "api".to_string(), "backend".to_string()],
            requirements: vec!["Basic computer knowledge".to_string()],
            what_you_learn: vec!["API testing".to_string(), "Backend validation".to_string()],
        }
    }
}

impl CourseTemplate {
    /// Wire body in the server's camelCase shape
    pub fn body(&self) -> Value {
        json!({
            "title": self.title,
            "description": self.description,
            "shortDescription": self.short_description,
            "category": self.category,
            "instructor": self.instructor,
            "duration": self.duration,
            "difficulty": self.difficulty,
            "language": self.language,
            "price": self.price,
            "currency": self.currency,
            "isPublished": self.is_published,
            "isFeatured": self.is_featured,
            "tags": self.tags,
            "requirements": self.requirements,
            "whatYouLearn": self.what_you_learn,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// `maxAttempts` set on the created quiz
    pub max_attempts: u32,

    /// `passingScore` set on the created quiz (percent)
    pub passing_score: f64,

    /// Points the server awards per correct answer
    pub correct_points: f64,

    /// Points the server deducts per wrong answer
    pub wrong_penalty: f64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            passing_score: 70.0,
            correct_points: 5.0,
            wrong_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Expectations {
    /// Status for `POST /auth/google` with a bogus credential.
    /// Deployments without Google sign-in configured answer 500.
    pub google_invalid_credential_status: u16,

    /// Allowed distance between reported and recomputed quiz score (points)
    pub score_tolerance: f64,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            google_invalid_credential_status: 401,
            score_tolerance: 5.0,
        }
    }
}
