use serde_json::json;
use tracing::info;

use super::{contains_id, list_items};
use crate::fixtures::{Entity, Fixture, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

pub(super) fn create(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let course = f.entity(Entity::Course)?;
    let title = h.config().course.title.clone();

    let request = ApiRequest::post("enrollments").auth(user).json(json!({
        "courseId": course,
        "courseTitle": title,
        "paymentData": { "method": "free", "amount": 0, "currency": "INR" },
    }));

    let Some(resp) = h.expect("Create Enrollment", 201, request)? else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/id") {
        Some(id) => {
            info!("Enrolled learner, enrollment {}", id);
            Ok(Fixture::Entity(Entity::Enrollment, id).into())
        }
        None => {
            h.require_fields("Create Enrollment - Id", &resp, &["/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn my_enrollments(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;

    if let Some(resp) = h.expect(
        "Get My Enrollments",
        200,
        ApiRequest::get("enrollments/my-enrollments").auth(user),
    )? {
        match f.entity(Entity::Enrollment) {
            Ok(id) => {
                let items = list_items(&resp.json().unwrap_or_default(), "enrollments");
                h.check("Get My Enrollments - Lists Enrollment", contains_id(&items, id), || {
                    format!("enrollment {} not in {} item(s)", id, items.len())
                });
            }
            Err(skipped) => h.skip("Get My Enrollments - Lists Enrollment", &skipped),
        }
    }

    h.expect(
        "Get My Enrollments - No Auth",
        401,
        ApiRequest::get("enrollments/my-enrollments"),
    )?;

    Ok(FixtureDelta::none())
}

pub(super) fn by_course(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let course = f.entity(Entity::Course)?;
    h.expect(
        "Get Enrollment by Course",
        200,
        ApiRequest::get(format!("enrollments/{}", course)).auth(user),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn update(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let id = f.entity(Entity::Enrollment)?;
    h.expect(
        "Update Enrollment",
        200,
        ApiRequest::put(format!("enrollments/{}", id))
            .auth(user)
            .json(json!({
                "completionPercentage": 50,
                "taskProgress": {
                    "totalTasks": 10,
                    "completedTasks": 5,
                    "completionPercentage": 50,
                },
            })),
    )?;
    Ok(FixtureDelta::none())
}
