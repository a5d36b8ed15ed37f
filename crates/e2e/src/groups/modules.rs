use serde_json::json;
use tracing::info;

use super::{contains_id, list_items};
use crate::fixtures::{Entity, Fixture, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

pub(super) fn create_module(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let course = f.entity(Entity::Course)?;
    let body = json!({
        "courseId": course,
        "title": "Test Module",
        "description": "Module created by the API test run",
        "orderIndex": 1,
        "durationMinutes": 30,
        "contentType": "video",
        "isPublished": true,
    });

    match f.token(Role::User) {
        Ok(user) => {
            h.expect(
                "Create Module - User (Non-Admin)",
                403,
                ApiRequest::post("modules").auth(user).json(body.clone()),
            )?;
        }
        Err(skipped) => h.skip("Create Module - User (Non-Admin)", &skipped),
    }

    let Some(resp) = h.expect(
        "Create Module - Admin",
        201,
        ApiRequest::post("modules").auth(admin).json(body),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/module/id") {
        Some(id) => {
            info!("Created test module {}", id);
            Ok(Fixture::Entity(Entity::Module, id).into())
        }
        None => {
            h.require_fields("Create Module - Module Id", &resp, &["/module/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn list_modules(h: &mut Harness, f: &Fixtures) -> StageResult {
    let course = f.entity(Entity::Course)?;

    if let Some(resp) = h.expect(
        "List Course Modules",
        200,
        ApiRequest::get(format!("modules/{}", course)),
    )? {
        match f.entity(Entity::Module) {
            Ok(module) => {
                let items = list_items(&resp.json().unwrap_or_default(), "modules");
                h.check("List Course Modules - Contains Module", contains_id(&items, module), || {
                    format!("module {} not in {} item(s)", module, items.len())
                });
            }
            Err(skipped) => h.skip("List Course Modules - Contains Module", &skipped),
        }
    }

    Ok(FixtureDelta::none())
}

pub(super) fn module_detail(h: &mut Harness, f: &Fixtures) -> StageResult {
    let module = f.entity(Entity::Module)?;
    h.expect(
        "Get Module Detail",
        200,
        ApiRequest::get(format!("modules/detail/{}", module)),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn update_module(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let module = f.entity(Entity::Module)?;
    h.expect(
        "Update Module",
        200,
        ApiRequest::put(format!("modules/{}", module))
            .auth(admin)
            .json(json!({ "title": "Updated Test Module", "durationMinutes": 45 })),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn create_lesson(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let module = f.entity(Entity::Module)?;

    let Some(resp) = h.expect(
        "Create Lesson",
        201,
        ApiRequest::post(format!("modules/{}/lessons", module))
            .auth(admin)
            .json(json!({
                "title": "Test Lesson",
                "description": "Lesson created by the API test run",
                "orderIndex": 1,
                "durationMinutes": 10,
                "contentType": "video",
                "contentUrl": "https://example.com/lesson.mp4",
                "isPublished": true,
            })),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/lesson/id") {
        Some(id) => Ok(Fixture::Entity(Entity::Lesson, id).into()),
        None => {
            h.require_fields("Create Lesson - Lesson Id", &resp, &["/lesson/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn list_lessons(h: &mut Harness, f: &Fixtures) -> StageResult {
    let module = f.entity(Entity::Module)?;

    if let Some(resp) = h.expect(
        "List Module Lessons",
        200,
        ApiRequest::get(format!("modules/{}/lessons", module)),
    )? {
        match f.entity(Entity::Lesson) {
            Ok(lesson) => {
                let items = list_items(&resp.json().unwrap_or_default(), "lessons");
                h.check("List Module Lessons - Contains Lesson", contains_id(&items, lesson), || {
                    format!("lesson {} not in {} item(s)", lesson, items.len())
                });
            }
            Err(skipped) => h.skip("List Module Lessons - Contains Lesson", &skipped),
        }
    }

    Ok(FixtureDelta::none())
}

pub(super) fn update_lesson(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let lesson = f.entity(Entity::Lesson)?;
    h.expect(
        "Update Lesson",
        200,
        ApiRequest::put(format!("modules/lessons/{}", lesson))
            .auth(admin)
            .json(json!({ "title": "Updated Test Lesson" })),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn reorder(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let course = f.entity(Entity::Course)?;
    let module = f.entity(Entity::Module)?;
    let path = format!("modules/reorder/{}", course);

    h.expect(
        "Reorder Modules",
        200,
        ApiRequest::put(path.as_str())
            .auth(admin)
            .json(json!({ "moduleOrder": [{ "moduleId": module, "orderIndex": 1 }] })),
    )?;

    h.expect(
        "Reorder Modules - Invalid Body",
        400,
        ApiRequest::put(path)
            .auth(admin)
            .json(json!({ "moduleOrder": "not-an-array" })),
    )?;

    Ok(FixtureDelta::none())
}
