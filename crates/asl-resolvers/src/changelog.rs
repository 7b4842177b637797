//! # Changelog
//!
//! One append-only row per processed message. A success row records the
//! request's action and the resulting record; a failure row has action
//! `"error"` and a state of `{message, stack, model, action, id}`.

use std::error::Error as StdError;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use asl_store::ChangelogEntry;

use crate::request::{ChangeRequest, Resolution};

/// Model name recorded when a failure happens before the body is known.
pub const UNKNOWN_MODEL: &str = "unknown";

fn parse_uuid(raw: Option<&str>) -> Option<Uuid> {
    raw.and_then(|s| Uuid::parse_str(s).ok())
}

/// The row written inside the resolver's transaction on success.
pub fn success(message_id: &str, request: &ChangeRequest, resolution: &Resolution, now: DateTime<Utc>) -> ChangelogEntry {
    ChangelogEntry {
        id: Uuid::new_v4(),
        message_id: message_id.to_string(),
        establishment_id: resolution.establishment_id,
        model_id: resolution.model_id.or_else(|| parse_uuid(request.id.as_deref())),
        model_type: request.model.clone(),
        action: request.action.clone(),
        changed_by: parse_uuid(request.changed_by.as_deref()),
        state: resolution.state.clone(),
        created_at: now,
    }
}

/// Render an error and every source beneath it, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// The row written in a fresh transaction after a failure.
///
/// `request` is `None` when the body could not be loaded.
pub fn failure(
    message_id: &str,
    request: Option<&ChangeRequest>,
    err: &(dyn StdError + 'static),
    now: DateTime<Utc>,
) -> ChangelogEntry {
    let (model, action, id, changed_by) = match request {
        Some(r) => (r.model.as_str(), Some(r.action.as_str()), r.id.as_deref(), r.changed_by.as_deref()),
        None => (UNKNOWN_MODEL, None, None, None),
    };
    let state = json!({
        "message": err.to_string(),
        "stack": error_chain(err),
        "model": model,
        "action": action.map_or(Value::Null, |a| Value::String(a.to_string())),
        "id": id.map_or(Value::Null, |i| Value::String(i.to_string())),
    });

    ChangelogEntry {
        id: Uuid::new_v4(),
        message_id: message_id.to_string(),
        establishment_id: None,
        model_id: parse_uuid(id),
        model_type: model.to_string(),
        action: "error".to_string(),
        changed_by: parse_uuid(changed_by),
        state,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use asl_store::StoreError;

    #[test]
    fn failure_state_carries_identifying_fields() {
        let request = ChangeRequest::new("project", "grant").with_id("6f1f4a52-3a8c-4b51-9a3e-6a1d2c3b4e5f");
        let err = ResolverError::not_found("project", "6f1f4a52-3a8c-4b51-9a3e-6a1d2c3b4e5f");
        let entry = failure("m-1", Some(&request), &err, Utc::now());

        assert!(entry.is_error());
        assert_eq!(entry.model_type, "project");
        assert_eq!(entry.state["action"], "grant");
        assert_eq!(entry.state["id"], "6f1f4a52-3a8c-4b51-9a3e-6a1d2c3b4e5f");
        assert!(entry.model_id.is_some());
        assert!(entry.state["message"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn failure_without_body_uses_unknown_model() {
        let err = ResolverError::UnknownModel("x".into());
        let entry = failure("m-2", None, &err, Utc::now());
        assert_eq!(entry.model_type, UNKNOWN_MODEL);
        assert!(entry.state["action"].is_null());
    }

    #[test]
    fn stack_includes_sources() {
        let err = ResolverError::Store(StoreError::Conflict("licence number taken".into()));
        let chain = error_chain(&err);
        assert!(chain.starts_with("storage failure"));
        assert!(chain.contains("caused by: conflict: licence number taken"));
    }

    #[test]
    fn success_row_uses_request_action() {
        let request = ChangeRequest::new("place", "create");
        let resolution = Resolution::new(Uuid::new_v4(), None, json!({"name": "Room"}));
        let entry = success("m-3", &request, &resolution, Utc::now());
        assert_eq!(entry.action, "create");
        assert_eq!(entry.model_id, resolution.model_id);
        assert_eq!(entry.state, json!({"name": "Room"}));
    }
}
