//! Reminder status. Dismissals are tracked as child records, not a status.

use serde::{Deserialize, Serialize};

/// Whether a condition reminder is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    /// Recorded against a draft; activates when the condition is granted.
    Pending,
    /// In force.
    Active,
}

status_strings!(ReminderStatus, "reminder", {
    Pending => "pending",
    Active => "active",
});
