//! The LMS pipeline, one module per test group
//!
//! Stage order is significant: later stages consume fixtures produced by
//! earlier ones (course before enrollment, enrollment before progress and
//! quiz attempts).

mod access;
mod attempts;
mod auth;
mod cleanup;
mod courses;
mod enrollments;
mod health;
mod learning;
mod modules;
mod progress;
mod quizzes;

use serde_json::Value;

use crate::pipeline::{Group, Stage};

/// Id used where a route needs an id the run never obtained.
/// Role checks run before lookups, so it is never dereferenced.
pub(crate) const PLACEHOLDER_ID: &str = "00000000-0000-0000-0000-000000000000";

pub fn pipeline() -> Vec<Stage> {
    vec![
        Stage::new(Group::Health, "Health Check", health::health_check),
        // Authentication
        Stage::new(Group::Auth, "Signup Validation", auth::signup_validation),
        Stage::new(Group::Auth, "Signup Success", auth::signup_success),
        Stage::new(Group::Auth, "Signup Round Trip", auth::signup_round_trip),
        Stage::new(Group::Auth, "Login Validation", auth::login_validation),
        Stage::new(Group::Auth, "Login Success", auth::login_success),
        Stage::new(Group::Auth, "Get Me - No Token", auth::me_without_token),
        Stage::new(Group::Auth, "Get Me - Invalid Token", auth::me_invalid_token),
        Stage::new(Group::Auth, "Get Me - With Token", auth::me_with_token),
        Stage::new(Group::Auth, "Profile Update", auth::profile_update),
        Stage::new(Group::Auth, "Forgot Password", auth::forgot_password),
        Stage::new(Group::Auth, "Verify OTP", auth::verify_otp),
        Stage::new(Group::Auth, "Reset Password", auth::reset_password),
        Stage::new(Group::Auth, "Login After Reset", auth::login_after_reset),
        Stage::new(Group::Auth, "Google Auth Validation", auth::google_validation),
        // Courses
        Stage::new(Group::Courses, "Courses List", courses::list),
        Stage::new(Group::Courses, "Create Course", courses::create),
        Stage::new(Group::Courses, "Create Course - Rejections", courses::create_rejections),
        Stage::new(Group::Courses, "Get Course", courses::get),
        Stage::new(Group::Courses, "Update Course", courses::update),
        // Enrollments
        Stage::new(Group::Enrollments, "Create Enrollment", enrollments::create),
        Stage::new(Group::Enrollments, "My Enrollments", enrollments::my_enrollments),
        Stage::new(Group::Enrollments, "Get Enrollment by Course", enrollments::by_course),
        Stage::new(Group::Enrollments, "Update Enrollment", enrollments::update),
        // Progress
        Stage::new(Group::Progress, "Progress Round Trip", progress::round_trip),
        Stage::new(Group::Progress, "Progress - No Auth", progress::unauthenticated),
        // Modules and lessons
        Stage::new(Group::Modules, "Create Module", modules::create_module),
        Stage::new(Group::Modules, "List Modules", modules::list_modules),
        Stage::new(Group::Modules, "Module Detail", modules::module_detail),
        Stage::new(Group::Modules, "Update Module", modules::update_module),
        Stage::new(Group::Modules, "Create Lesson", modules::create_lesson),
        Stage::new(Group::Modules, "List Lessons", modules::list_lessons),
        Stage::new(Group::Modules, "Update Lesson", modules::update_lesson),
        Stage::new(Group::Modules, "Reorder Modules", modules::reorder),
        // Quiz authoring
        Stage::new(Group::Quizzes, "Create Quiz", quizzes::create_quiz),
        Stage::new(Group::Quizzes, "Add Questions", quizzes::add_questions),
        Stage::new(Group::Quizzes, "List Quizzes", quizzes::list_quizzes),
        Stage::new(Group::Quizzes, "Get Quiz - Admin", quizzes::admin_read),
        Stage::new(Group::Quizzes, "Update Quiz", quizzes::update_quiz),
        Stage::new(Group::Quizzes, "Update Question", quizzes::update_question),
        // Quiz attempts
        Stage::new(Group::Attempts, "Start Quiz", attempts::start),
        Stage::new(Group::Attempts, "Fetch Quiz Questions", attempts::fetch_questions),
        Stage::new(Group::Attempts, "Submit Quiz", attempts::submit),
        Stage::new(Group::Attempts, "Verify Quiz Score", attempts::verify_score),
        Stage::new(Group::Attempts, "Attempt History", attempts::history),
        Stage::new(Group::Attempts, "Resubmit Attempt", attempts::resubmit),
        Stage::new(Group::Attempts, "Attempt Limit", attempts::attempt_limit),
        // Module/lesson level progress
        Stage::new(Group::LearningProgress, "Learning Progress Overview", learning::overview),
        Stage::new(Group::LearningProgress, "Module Progress", learning::module_progress),
        Stage::new(Group::LearningProgress, "Lesson Progress", learning::lesson_progress),
        Stage::new(Group::LearningProgress, "Complete Module", learning::complete_module),
        // Negative sweep
        Stage::new(Group::AccessControl, "Admin Routes - User Token", access::user_token_sweep),
        Stage::new(Group::AccessControl, "Admin Routes - No Token", access::anonymous_sweep),
        // Teardown
        Stage::new(Group::Cleanup, "Cleanup", cleanup::cleanup),
    ]
}

/// Items of a list response, whether bare or wrapped under `key`
pub(crate) fn list_items(body: &Value, key: &str) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// True when any item's `id` equals `id` (string or numeric)
pub(crate) fn contains_id(items: &[Value], id: &str) -> bool {
    items.iter().any(|item| match item.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    })
}
