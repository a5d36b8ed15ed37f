//! Best-effort teardown of everything the run created
//!
//! Deletes run children first (questions, quiz, lesson, module, enrollment)
//! and the course last. Outcomes are logged, never recorded, so cleanup
//! cannot change the verdict of the run.

use tracing::{info, warn};

use crate::error::ProbeResult;
use crate::fixtures::{AuthToken, Entity, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

/// One delete to attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Removal {
    pub label: String,
    pub role: Role,
    pub path: String,
}

impl Removal {
    fn new(label: impl Into<String>, role: Role, path: String) -> Self {
        Self {
            label: label.into(),
            role,
            path,
        }
    }
}

/// Deletes in dependency order; handles that were never set are left out
pub(crate) fn plan(f: &Fixtures) -> Vec<Removal> {
    let mut removals = Vec::new();

    if let Ok(questions) = f.questions() {
        for question in questions {
            removals.push(Removal::new(
                "quiz question",
                Role::Admin,
                format!("quizzes/questions/{}", question.id),
            ));
        }
    }
    if let Ok(id) = f.entity(Entity::Quiz) {
        removals.push(Removal::new("quiz", Role::Admin, format!("quizzes/{}", id)));
    }
    if let Ok(id) = f.entity(Entity::Lesson) {
        removals.push(Removal::new("lesson", Role::Admin, format!("modules/lessons/{}", id)));
    }
    if let Ok(id) = f.entity(Entity::Module) {
        removals.push(Removal::new("module", Role::Admin, format!("modules/{}", id)));
    }
    if let Ok(id) = f.entity(Entity::Enrollment) {
        removals.push(Removal::new("enrollment", Role::User, format!("enrollments/{}", id)));
    }
    if let Ok(id) = f.entity(Entity::Course) {
        removals.push(Removal::new("course", Role::Admin, format!("courses/{}", id)));
    }

    removals
}

pub(super) fn cleanup(h: &mut Harness, f: &Fixtures) -> StageResult {
    let removals = plan(f);
    if removals.is_empty() {
        info!("Nothing to clean up");
        return Ok(FixtureDelta::none());
    }

    for removal in removals {
        // Enrollments fall back to the admin token when the learner never logged in
        let token = f.token(removal.role).or_else(|_| f.token(Role::Admin));
        match token {
            Ok(token) => remove(h, &removal, token)?,
            Err(skipped) => warn!("Could not delete test {}: {}", removal.label, skipped),
        }
    }

    Ok(FixtureDelta::none())
}

fn remove(h: &mut Harness, removal: &Removal, token: &AuthToken) -> ProbeResult<()> {
    let request = ApiRequest::delete(removal.path.as_str()).auth(token);
    match h.send(request)? {
        Ok(resp) if (200..300).contains(&resp.status) => {
            info!("✅ Test {} deleted", removal.label)
        }
        Ok(resp) if resp.status == 404 => {
            warn!("Test {} already gone ({})", removal.label, removal.path)
        }
        Ok(resp) => warn!(
            "Failed to delete test {}: status {}",
            removal.label, resp.status
        ),
        Err(e) => warn!("Failed to delete test {}: {}", removal.label, e),
    }
    Ok(())
}
