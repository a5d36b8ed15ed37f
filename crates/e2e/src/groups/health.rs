use serde_json::Value;
use tracing::info;

use crate::fixtures::{FixtureDelta, Fixtures};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

pub(super) fn health_check(h: &mut Harness, _: &Fixtures) -> StageResult {
    if let Some(resp) = h.expect("Health Check", 200, ApiRequest::get("health"))? {
        let status = match resp.pointer("/status") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };
        info!("Server status: {}", status.as_deref().unwrap_or("unknown"));
        h.check("Health Check - Status Field", status.is_some(), || {
            "status field missing or empty".to_string()
        });
    }
    Ok(FixtureDelta::none())
}
