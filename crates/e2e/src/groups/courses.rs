use serde_json::json;
use tracing::info;

use super::PLACEHOLDER_ID;
use crate::fixtures::{Entity, Fixture, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

pub(super) fn list(h: &mut Harness, _: &Fixtures) -> StageResult {
    h.expect("Get Courses - Public", 200, ApiRequest::get("courses"))?;
    h.expect(
        "Get Courses - With Filters",
        200,
        ApiRequest::get("courses?category=Technology&featured=true"),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn create(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let body = h.config().course.body();

    let Some(resp) = h.expect(
        "Create Course - Admin",
        201,
        ApiRequest::post("courses").auth(admin).json(body),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/course/id") {
        Some(id) => {
            info!("Created test course {}", id);
            Ok(Fixture::Entity(Entity::Course, id).into())
        }
        None => {
            h.require_fields("Create Course - Course Id", &resp, &["/course/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn create_rejections(h: &mut Harness, f: &Fixtures) -> StageResult {
    let body = h.config().course.body();

    h.expect(
        "Create Course - No Auth",
        401,
        ApiRequest::post("courses").json(body.clone()),
    )?;

    match f.token(Role::User) {
        Ok(user) => {
            h.expect(
                "Create Course - User (Non-Admin)",
                403,
                ApiRequest::post("courses").auth(user).json(body),
            )?;
        }
        Err(skipped) => h.skip("Create Course - User (Non-Admin)", &skipped),
    }

    Ok(FixtureDelta::none())
}

pub(super) fn get(h: &mut Harness, f: &Fixtures) -> StageResult {
    let id = f.entity(Entity::Course)?;

    if let Some(resp) = h.expect(
        "Get Course by ID",
        200,
        ApiRequest::get(format!("courses/{}", id)),
    )? {
        let reported = resp.string_at("/id");
        h.check("Get Course by ID - Matches", reported.as_deref() == Some(id), || {
            format!("expected id {}, got {:?}", id, reported)
        });
    }

    h.expect(
        "Get Course - Non-existent",
        404,
        ApiRequest::get(format!("courses/{}", PLACEHOLDER_ID)),
    )?;

    Ok(FixtureDelta::none())
}

pub(super) fn update(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let id = f.entity(Entity::Course)?;
    let changes = json!({ "title": "Updated Test Course", "price": 1299 });

    h.expect(
        "Update Course - Admin",
        200,
        ApiRequest::put(format!("courses/{}", id))
            .auth(admin)
            .json(changes.clone()),
    )?;

    match f.token(Role::User) {
        Ok(user) => {
            h.expect(
                "Update Course - User (Non-Admin)",
                403,
                ApiRequest::put(format!("courses/{}", id)).auth(user).json(changes),
            )?;
        }
        Err(skipped) => h.skip("Update Course - User (Non-Admin)", &skipped),
    }

    Ok(FixtureDelta::none())
}
