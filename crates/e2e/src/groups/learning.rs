use serde_json::json;

use crate::fixtures::{Entity, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

pub(super) fn overview(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let course = f.entity(Entity::Course)?;
    let path = format!("learning-progress/{}", course);

    h.expect(
        "Get Learning Progress",
        200,
        ApiRequest::get(path.as_str()).auth(user),
    )?;
    h.expect("Get Learning Progress - No Auth", 401, ApiRequest::get(path))?;

    Ok(FixtureDelta::none())
}

pub(super) fn module_progress(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let module = f.entity(Entity::Module)?;
    h.expect(
        "Update Module Progress",
        200,
        ApiRequest::put(format!("learning-progress/module/{}", module))
            .auth(user)
            .json(json!({
                "progressPercentage": 50,
                "timeSpentMinutes": 10,
                "status": "in_progress",
            })),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn lesson_progress(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let lesson = f.entity(Entity::Lesson)?;
    h.expect(
        "Update Lesson Progress",
        200,
        ApiRequest::put(format!("learning-progress/lesson/{}", lesson))
            .auth(user)
            .json(json!({
                "progressPercentage": 100,
                "timeSpentMinutes": 5,
                "lastPosition": 120,
                "status": "completed",
            })),
    )?;
    Ok(FixtureDelta::none())
}

/// Completion is gated on the module's required quiz
pub(super) fn complete_module(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let module = f.entity(Entity::Module)?;
    f.entity(Entity::Quiz)?;

    let passing_score = h.config().quiz.passing_score;
    let passed = f
        .submission()
        .map(|s| s.passed.unwrap_or(s.score >= passing_score))
        .unwrap_or(false);

    let (name, expected) = if passed {
        ("Complete Module - Quiz Passed", 200)
    } else {
        ("Complete Module - Quiz Not Passed", 400)
    };
    h.expect(
        name,
        expected,
        ApiRequest::post(format!("learning-progress/module/{}/complete", module)).auth(user),
    )?;
    Ok(FixtureDelta::none())
}
