//! # Condition Reminders
//!
//! A condition may carry a `reminders` map:
//!
//! ```json
//! { "key": "poles", "reminders": { "active": ["poles"], "poles": [{ "id": "…", "deadline": "2025-01-01" }] } }
//! ```
//!
//! Every deadline item becomes a reminder row tagged with the condition key.
//! Rows for keys not listed in `active`, or belonging to a soft-deleted
//! condition or protocol, are produced already deleted: they record what
//! would apply without arming it.
//!
//! At grant time [`ReminderFate::decide`] says what happens to each stored
//! reminder given the granted version's live condition keys.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use asl_core::document::is_deleted;
use asl_core::temporal::parse_date;
use asl_core::{ValidationError, VersionData};

/// A reminder row implied by condition data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReminder {
    /// Identity supplied by the document, if any.
    pub id: Option<Uuid>,
    /// The condition key this reminder belongs to.
    pub condition_key: String,
    /// Calendar date the obligation falls due.
    pub deadline: NaiveDate,
    /// Whether the row should be stored soft-deleted.
    pub deleted: bool,
}

/// Every condition in the document paired with whether it is live
/// (neither it nor its protocol is soft-deleted).
fn all_conditions(data: &VersionData) -> Vec<(&Value, bool)> {
    let top = data.conditions().iter().map(|c| (c, !is_deleted(c)));
    let nested = data.protocols().iter().flat_map(|p| {
        let protocol_live = !is_deleted(p);
        p.get("conditions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |c| (c, protocol_live && !is_deleted(c)))
    });
    top.chain(nested).collect()
}

/// Keys of every live condition, top-level and per protocol.
pub fn condition_keys(data: &VersionData) -> BTreeSet<String> {
    all_conditions(data)
        .into_iter()
        .filter(|(_, live)| *live)
        .filter_map(|(c, _)| c.get("key").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Extract reminder rows from every condition's `reminders` map.
///
/// Fails on a deadline that is not a calendar date.
pub fn extract_reminders(data: &VersionData) -> Result<Vec<ExtractedReminder>, ValidationError> {
    let mut out = Vec::new();
    for (condition, live) in all_conditions(data) {
        let Some(reminders) = condition.get("reminders").and_then(Value::as_object) else {
            continue;
        };
        let active: BTreeSet<&str> = reminders
            .get("active")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (key, items) in reminders {
            if key == "active" {
                continue;
            }
            let Some(items) = items.as_array() else {
                continue;
            };
            for item in items {
                let Some(deadline) = item.get("deadline").and_then(Value::as_str) else {
                    return Err(ValidationError::MissingField("deadline"));
                };
                out.push(ExtractedReminder {
                    id: item
                        .get("id")
                        .and_then(Value::as_str)
                        .and_then(|s| Uuid::parse_str(s).ok()),
                    condition_key: key.clone(),
                    deadline: parse_date(deadline)?,
                    deleted: !live || !active.contains(key.as_str()),
                });
            }
        }
    }
    Ok(out)
}

/// What happens to a stored reminder when a version is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderFate {
    /// Leave the reminder as it is.
    Keep,
    /// Soft-delete: its condition is gone from the granted data.
    Delete,
    /// Arm a pending reminder whose condition was granted.
    Activate,
}

impl ReminderFate {
    /// Decide the fate of a reminder for `condition_key`, currently
    /// `pending` or not, against the granted version's live keys.
    pub fn decide(condition_key: &str, pending: bool, granted_keys: &BTreeSet<String>) -> Self {
        if !granted_keys.contains(condition_key) {
            Self::Delete
        } else if pending {
            Self::Activate
        } else {
            Self::Keep
        }
    }
}
