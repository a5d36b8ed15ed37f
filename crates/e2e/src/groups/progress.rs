use serde_json::json;

use crate::fixtures::{Entity, FixtureDelta, Fixtures, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

const TARGET_PERCENTAGE: f64 = 75.0;

pub(super) fn round_trip(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let course = f.entity(Entity::Course)?;
    let path = format!("progress/{}", course);

    h.expect("Get Progress", 200, ApiRequest::get(path.as_str()).auth(user))?;

    let updated = h.expect(
        "Update Progress",
        200,
        ApiRequest::put(path.as_str()).auth(user).json(json!({
            "completionPercentage": TARGET_PERCENTAGE,
            "currentModule": 2,
            "currentLesson": 3,
            "timeSpent": 3600,
        })),
    )?;
    if updated.is_none() {
        return Ok(FixtureDelta::none());
    }

    let request = ApiRequest::get(path).auth(user);
    if let Some(resp) = h.expect("Get Progress - Read Back", 200, request)? {
        let reported = resp
            .number_at("/completionPercentage")
            .or_else(|| resp.number_at("/progress/completionPercentage"));
        h.check(
            "Get Progress - Read Back Value",
            reported.is_some_and(|p| p >= TARGET_PERCENTAGE),
            || {
                format!(
                    "expected completionPercentage >= {}, got {:?}",
                    TARGET_PERCENTAGE, reported
                )
            },
        );
    }

    Ok(FixtureDelta::none())
}

pub(super) fn unauthenticated(h: &mut Harness, f: &Fixtures) -> StageResult {
    let course = f.entity(Entity::Course)?;
    h.expect(
        "Get Progress - No Auth",
        401,
        ApiRequest::get(format!("progress/{}", course)),
    )?;
    Ok(FixtureDelta::none())
}
