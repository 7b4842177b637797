//! # Change Requests
//!
//! The wire body every message dereferences to, and the context a resolver
//! runs in. Payload helpers here turn untyped `data` fields into typed
//! values with [`ValidationError`]s that name the field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::temporal::parse_timestamp;
use asl_core::{ProfileId, ValidationError};

use crate::error::ResolverError;

/// `{model, action, id?, data?, changedBy?, meta?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub model: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ChangeRequest {
    /// A request with no id or payload.
    pub fn new(model: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            action: action.into(),
            id: None,
            data: None,
            changed_by: None,
            meta: None,
        }
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn changed_by(mut self, profile: impl ToString) -> Self {
        self.changed_by = Some(profile.to_string());
        self
    }

    /// The payload as an object; anything else is treated as empty.
    pub fn data_map(&self) -> Map<String, Value> {
        match &self.data {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// The `id` field, or [`ResolverError::MissingId`].
    pub fn require_id(&self) -> Result<&str, ResolverError> {
        self.id.as_deref().ok_or_else(|| ResolverError::MissingId {
            model: self.model.clone(),
            action: self.action.clone(),
        })
    }

    /// The `id` field parsed as a UUID.
    pub fn require_uuid(&self) -> Result<Uuid, ResolverError> {
        let raw = self.require_id()?;
        Uuid::parse_str(raw).map_err(|_| {
            ValidationError::InvalidIdentifier {
                kind: "record",
                value: raw.to_string(),
            }
            .into()
        })
    }

    /// The acting profile, if any and well formed.
    pub fn actor(&self) -> Result<Option<ProfileId>, ResolverError> {
        match self.changed_by.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(ProfileId::parse(raw)?)),
        }
    }
}

/// Per-message context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// The instant the processor took as "now" for this message.
    pub now: DateTime<Utc>,
    /// The acting profile.
    pub actor: Option<ProfileId>,
}

impl Context {
    pub fn new(now: DateTime<Utc>, actor: Option<ProfileId>) -> Self {
        Self { now, actor }
    }
}

/// What a resolver did, rendered for the changelog.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The record the request addressed.
    pub model_id: Option<Uuid>,
    /// The establishment that record belongs to, for audit filtering.
    pub establishment_id: Option<Uuid>,
    /// The resulting record, or `null` after a delete.
    pub state: Value,
}

impl Resolution {
    pub fn new(model_id: impl Into<Uuid>, establishment_id: Option<Uuid>, state: Value) -> Self {
        Self {
            model_id: Some(model_id.into()),
            establishment_id,
            state,
        }
    }
}

// ─── Payload fields ──────────────────────────────────────────────────

/// An optional string field; empty strings count as absent.
pub(crate) fn opt_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// A required string field.
pub(crate) fn req_str<'a>(data: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, ValidationError> {
    opt_str(data, key).ok_or(ValidationError::MissingField(key))
}

/// An optional identifier field.
pub(crate) fn opt_id<T>(
    data: &Map<String, Value>,
    key: &str,
    parse: fn(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    opt_str(data, key).map(parse).transpose()
}

/// An optional timestamp field.
pub(crate) fn opt_timestamp(data: &Map<String, Value>, key: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    opt_str(data, key).map(parse_timestamp).transpose()
}

/// Flag semantics shared with [`asl_core::VersionData::flag`].
pub(crate) fn flag(data: &Map<String, Value>, key: &str) -> bool {
    matches!(data.get(key), Some(Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_body() {
        let body = r#"{"model":"project","action":"grant","id":"6f1f4a52-3a8c-4b51-9a3e-6a1d2c3b4e5f","changedBy":"0b1e7f4c-5d43-4a2a-9b1a-1f2e3d4c5b6a"}"#;
        let req: ChangeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.model, "project");
        assert_eq!(req.action, "grant");
        assert!(req.actor().unwrap().is_some());
        assert!(req.data.is_none());
    }

    #[test]
    fn missing_id_is_reported_with_model_and_action() {
        let req = ChangeRequest::new("place", "update");
        let err = req.require_id().unwrap_err();
        assert_eq!(err.kind(), "missing_id");
        assert_eq!(err.to_string(), "place update requires an id");
    }

    #[test]
    fn malformed_actor_is_a_validation_error() {
        let req = ChangeRequest::new("project", "grant").changed_by("nobody");
        assert_eq!(req.actor().unwrap_err().kind(), "validation");
    }

    #[test]
    fn non_object_data_is_empty() {
        let req = ChangeRequest::new("project", "create").with_data(json!([1, 2]));
        assert!(req.data_map().is_empty());
    }
}
