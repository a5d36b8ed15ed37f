//! Negative sweep over admin-only routes
//!
//! Handles the run never created are replaced by [`PLACEHOLDER_ID`]; the
//! server checks the caller's role before it looks anything up.

use serde_json::json;

use super::PLACEHOLDER_ID;
use crate::fixtures::{Entity, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

/// Every admin-only route, with ids filled from the fixtures
pub(crate) fn admin_routes(f: &Fixtures) -> Vec<ApiRequest> {
    let course = f.entity_or(Entity::Course, PLACEHOLDER_ID);
    let module = f.entity_or(Entity::Module, PLACEHOLDER_ID);
    let lesson = f.entity_or(Entity::Lesson, PLACEHOLDER_ID);
    let quiz = f.entity_or(Entity::Quiz, PLACEHOLDER_ID);
    let question = f
        .questions()
        .ok()
        .and_then(|q| q.first())
        .map(|q| q.id.as_str())
        .unwrap_or(PLACEHOLDER_ID);
    let empty = json!({});

    vec![
        ApiRequest::get("courses/admin"),
        ApiRequest::post("courses").json(empty.clone()),
        ApiRequest::put(format!("courses/{}", course)).json(empty.clone()),
        ApiRequest::delete(format!("courses/{}", course)),
        ApiRequest::get("enrollments"),
        ApiRequest::post("modules").json(json!({ "courseId": course })),
        ApiRequest::put(format!("modules/{}", module)).json(empty.clone()),
        ApiRequest::delete(format!("modules/{}", module)),
        ApiRequest::put(format!("modules/reorder/{}", course)).json(json!({ "moduleOrder": [] })),
        ApiRequest::post(format!("modules/{}/lessons", module)).json(empty.clone()),
        ApiRequest::put(format!("modules/lessons/{}", lesson)).json(empty.clone()),
        ApiRequest::delete(format!("modules/lessons/{}", lesson)),
        ApiRequest::post("quizzes").json(json!({ "courseId": course })),
        ApiRequest::put(format!("quizzes/{}", quiz)).json(empty.clone()),
        ApiRequest::delete(format!("quizzes/{}", quiz)),
        ApiRequest::post(format!("quizzes/{}/questions", quiz)).json(empty.clone()),
        ApiRequest::put(format!("quizzes/questions/{}", question)).json(empty),
        ApiRequest::delete(format!("quizzes/questions/{}", question)),
    ]
}

/// Subset probed without any token
pub(crate) fn anonymous_routes(f: &Fixtures) -> Vec<ApiRequest> {
    let course = f.entity_or(Entity::Course, PLACEHOLDER_ID);
    let quiz = f.entity_or(Entity::Quiz, PLACEHOLDER_ID);

    vec![
        ApiRequest::get("courses/admin"),
        ApiRequest::post("courses").json(json!({})),
        ApiRequest::post("modules").json(json!({ "courseId": course })),
        ApiRequest::post("quizzes").json(json!({ "courseId": course })),
        ApiRequest::post(format!("quizzes/{}/start", quiz)),
        ApiRequest::get("enrollments/my-enrollments"),
    ]
}

pub(super) fn user_token_sweep(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    for request in admin_routes(f) {
        let name = format!("Access Control - {} (user)", request);
        h.expect(&name, 403, request.auth(user))?;
    }
    Ok(FixtureDelta::none())
}

pub(super) fn anonymous_sweep(h: &mut Harness, f: &Fixtures) -> StageResult {
    for request in anonymous_routes(f) {
        let name = format!("Access Control - {} (no token)", request);
        h.expect(&name, 401, request)?;
    }
    Ok(FixtureDelta::none())
}
