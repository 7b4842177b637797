//! Additional-site availability: which establishments a version selects
//! beyond the primary one, and the grant-time reconciliation plan.

use std::collections::BTreeSet;

use serde_json::Value;
use uuid::Uuid;

use asl_core::document::is_deleted;
use asl_core::VersionData;

/// Establishments selected by a version.
///
/// Honoured only when `other-establishments` is `true`; deleted entries and
/// entries without a parsable `establishment-id` are skipped.
pub fn selected_establishments(data: &VersionData) -> BTreeSet<Uuid> {
    if !data.flag("other-establishments") {
        return BTreeSet::new();
    }
    data.array("establishments")
        .iter()
        .filter(|e| !is_deleted(e))
        .filter_map(|e| e.get("establishment-id").and_then(Value::as_str))
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect()
}

/// Site changes implied by granting a version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityPlan {
    /// Sites selected by the previous grant but not this one.
    pub remove: BTreeSet<Uuid>,
    /// Sites selected by this grant; rows in `draft` or `removed` become
    /// `active`, missing rows are created `active`.
    pub activate: BTreeSet<Uuid>,
}

impl AvailabilityPlan {
    /// Compare the previous granted selection with the new one.
    pub fn between(previous: &BTreeSet<Uuid>, next: &BTreeSet<Uuid>) -> Self {
        Self {
            remove: previous.difference(next).copied().collect(),
            activate: next.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::from_u128(0xA), Uuid::from_u128(0xB), Uuid::from_u128(0xC))
    }

    #[test]
    fn selection_requires_flag() {
        let (a, _, _) = ids();
        let data = VersionData::from(json!({
            "establishments": [{"establishment-id": a.to_string()}]
        }));
        assert!(selected_establishments(&data).is_empty());
    }

    #[test]
    fn selection_skips_deleted_and_malformed() {
        let (a, b, _) = ids();
        let data = VersionData::from(json!({
            "other-establishments": true,
            "establishments": [
                {"establishment-id": a.to_string()},
                {"establishment-id": b.to_string(), "deleted": true},
                {"establishment-id": "not-a-uuid"},
                {"name": "no id"}
            ]
        }));
        assert_eq!(selected_establishments(&data), [a].into_iter().collect());
    }

    #[test]
    fn plan_removes_dropped_and_activates_selected() {
        let (a, b, c) = ids();
        let prev: BTreeSet<Uuid> = [a, b].into_iter().collect();
        let next: BTreeSet<Uuid> = [b, c].into_iter().collect();
        let plan = AvailabilityPlan::between(&prev, &next);
        assert_eq!(plan.remove, [a].into_iter().collect());
        assert_eq!(plan.activate, [b, c].into_iter().collect());
    }
}
