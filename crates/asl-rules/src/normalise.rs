//! Strip soft-deleted protocols and conditions from version data before it
//! is frozen by a grant.

use serde_json::Value;

use asl_core::document::is_deleted;
use asl_core::VersionData;

/// Keys inside a protocol whose array items may carry a `deleted` marker.
const PROTOCOL_LISTS: [&str; 2] = ["conditions", "steps"];

/// A copy of `data` without soft-deleted protocols, protocol conditions and
/// steps, or top-level conditions.
pub fn strip_deleted(data: &VersionData) -> VersionData {
    let mut out = data.clone();

    if let Some(protocols) = out.array_mut("protocols") {
        protocols.retain(|p| !is_deleted(p));
        for protocol in protocols.iter_mut() {
            for key in PROTOCOL_LISTS {
                if let Some(Value::Array(items)) = protocol.get_mut(key) {
                    items.retain(|item| !is_deleted(item));
                }
            }
        }
    }

    if let Some(conditions) = out.array_mut("conditions") {
        conditions.retain(|c| !is_deleted(c));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_deleted_items_at_every_level() {
        let data = VersionData::from(json!({
            "title": "t",
            "protocols": [
                {"id": "a", "conditions": [{"key": "x"}, {"key": "y", "deleted": true}],
                 "steps": [{"id": "s1", "deleted": true}, {"id": "s2"}]},
                {"id": "b", "deleted": true}
            ],
            "conditions": [{"key": "c1", "deleted": true}, {"key": "c2"}]
        }));
        let clean = strip_deleted(&data);
        assert_eq!(clean.protocols().len(), 1);
        assert_eq!(clean.protocols()[0]["conditions"], json!([{"key": "x"}]));
        assert_eq!(clean.protocols()[0]["steps"], json!([{"id": "s2"}]));
        assert_eq!(clean.conditions(), &[json!({"key": "c2"})]);
        assert_eq!(clean.title(), Some("t"));
    }

    #[test]
    fn leaves_input_untouched() {
        let data = VersionData::from(json!({"conditions": [{"key": "c", "deleted": true}]}));
        let _ = strip_deleted(&data);
        assert_eq!(data.conditions().len(), 1);
    }
}
