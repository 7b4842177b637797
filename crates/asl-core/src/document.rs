//! # Version Data Document
//!
//! The structured document carried by every project version and
//! retrospective assessment. Its schema belongs to the presentation layer,
//! so the engine keeps it as a `serde_json::Value` tree and reads only a
//! documented set of paths:
//!
//! | Path | Used by |
//! |---|---|
//! | `title` | grant, convert, transfer |
//! | `duration` | expiry rule |
//! | `protocols[]` | species, RA rule, normalisation, conditions |
//! | `conditions[]` | reminders, normalisation |
//! | `species[]`, `species-other*` | species extraction, RA rule |
//! | `other-establishments`, `establishments[]` | additional availability |
//! | `transferToEstablishment*` | transfer |
//! | `isLegacyStub` | create, convert |
//!
//! Anything else passes through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that mark a version as the subject of a transfer.
pub const TRANSFER_MARKERS: [&str; 2] = ["transferToEstablishment", "transferToEstablishmentName"];

/// Opaque structured document attached to a version.
///
/// Always an object at the top level; constructing from any other JSON value
/// yields an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct VersionData(Map<String, Value>);

impl VersionData {
    /// An empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Borrow the top-level object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Read a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Write a top-level key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Remove a top-level key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Shallow merge: every top-level key of `patch` overwrites ours.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (k, v) in patch {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Truthiness of a top-level flag. Only JSON `true` counts.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// A top-level string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// A top-level array, or an empty slice if absent or not an array.
    pub fn array(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable access to a top-level array, if present.
    pub fn array_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        self.0.get_mut(key).and_then(Value::as_array_mut)
    }

    /// The version title.
    pub fn title(&self) -> Option<&str> {
        self.str("title")
    }

    /// The raw `duration` object, if any.
    pub fn duration(&self) -> Option<&Value> {
        self.0.get("duration")
    }

    /// All protocols, including soft-deleted ones.
    pub fn protocols(&self) -> &[Value] {
        self.array("protocols")
    }

    /// Top-level conditions, including soft-deleted ones.
    pub fn conditions(&self) -> &[Value] {
        self.array("conditions")
    }

    /// Whether this document came from a digitised paper licence.
    pub fn is_legacy_stub(&self) -> bool {
        self.flag("isLegacyStub")
    }

    /// Destination establishment recorded for a transfer, if any.
    pub fn transfer_destination(&self) -> Option<&str> {
        self.str("transferToEstablishment")
    }

    /// Remove every transfer marker key.
    pub fn strip_transfer_markers(&mut self) {
        for key in TRANSFER_MARKERS {
            self.0.remove(key);
        }
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Default for VersionData {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for VersionData {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }
}

impl From<Map<String, Value>> for VersionData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<VersionData> for Value {
    fn from(data: VersionData) -> Self {
        data.into_value()
    }
}

/// Whether a nested JSON item (protocol, condition, establishment entry)
/// carries a soft-delete marker.
///
/// A `deleted` key counts when it is `true` or a timestamp string.
pub fn is_deleted(item: &Value) -> bool {
    match item.get("deleted") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_becomes_empty() {
        let data = VersionData::from(json!([1, 2, 3]));
        assert!(data.as_map().is_empty());
    }

    #[test]
    fn merge_overwrites_top_level() {
        let mut data = VersionData::from(json!({"title": "old", "keep": 1}));
        let patch = json!({"title": "new"});
        data.merge(patch.as_object().unwrap());
        assert_eq!(data.title(), Some("new"));
        assert_eq!(data.get("keep"), Some(&json!(1)));
    }

    #[test]
    fn flag_requires_literal_true() {
        let data = VersionData::from(json!({"a": true, "b": "true", "c": 1}));
        assert!(data.flag("a"));
        assert!(!data.flag("b"));
        assert!(!data.flag("c"));
        assert!(!data.flag("missing"));
    }

    #[test]
    fn strip_transfer_markers_removes_both() {
        let mut data = VersionData::from(json!({
            "title": "t",
            "transferToEstablishment": "x",
            "transferToEstablishmentName": "Site"
        }));
        data.strip_transfer_markers();
        assert!(data.transfer_destination().is_none());
        assert!(data.get("transferToEstablishmentName").is_none());
        assert_eq!(data.title(), Some("t"));
    }

    #[test]
    fn deleted_marker_variants() {
        assert!(is_deleted(&json!({"deleted": true})));
        assert!(is_deleted(&json!({"deleted": "2020-01-01T00:00:00Z"})));
        assert!(!is_deleted(&json!({"deleted": false})));
        assert!(!is_deleted(&json!({"deleted": ""})));
        assert!(!is_deleted(&json!({})));
    }

    #[test]
    fn serde_is_transparent_object() {
        let data = VersionData::from(json!({"title": "x"}));
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v, json!({"title": "x"}));
    }
}
