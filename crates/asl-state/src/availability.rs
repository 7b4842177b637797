//! # Additional Availability Status
//!
//! Status of a project's permission to operate at a non-primary
//! establishment. `draft` rows are proposals recorded at submission;
//! granting a version activates or removes them.

use serde::{Deserialize, Serialize};

/// Status of a project–establishment availability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    /// Proposed by a submitted version, not yet granted.
    Draft,
    /// Granted and in force.
    Active,
    /// Dropped by a later granted version.
    Removed,
}

status_strings!(AvailabilityStatus, "availability", {
    Draft => "draft",
    Active => "active",
    Removed => "removed",
});

impl AvailabilityStatus {
    /// Whether granting a version that selects this site should (re)activate it.
    pub fn needs_activation(&self) -> bool {
        matches!(self, Self::Draft | Self::Removed)
    }
}
