//! # Project Version Status
//!
//! ```text
//! draft ──submit──▶ submitted ──grant────▶ granted
//!   │                   └──withdraw──▶ withdrawn
//!   └────────convert (legacy stub)──────▶ granted
//! ```
//!
//! A granted version is immutable. Amendments fork a new version.

use serde::{Deserialize, Serialize};

use crate::LifecycleError;

/// The lifecycle state of a single project version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Being edited.
    Draft,
    /// Sent to the regulator for a decision.
    Submitted,
    /// Pulled back by the applicant before a decision.
    Withdrawn,
    /// Approved; the licence content in force.
    Granted,
}

status_strings!(VersionStatus, "version", {
    Draft => "draft",
    Submitted => "submitted",
    Withdrawn => "withdrawn",
    Granted => "granted",
});

impl VersionStatus {
    /// Whether the version may still be edited in place.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Validate a transition to `to`.
    pub fn transition(self, to: Self) -> Result<Self, LifecycleError> {
        let ok = matches!(
            (self, to),
            (Self::Draft, Self::Submitted)
                | (Self::Draft, Self::Granted)
                | (Self::Submitted, Self::Granted)
                | (Self::Submitted, Self::Withdrawn)
        );
        if ok {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition {
                record: "version",
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = VersionStatus::Draft
            .transition(VersionStatus::Submitted)
            .and_then(|s| s.transition(VersionStatus::Granted))
            .unwrap();
        assert_eq!(s, VersionStatus::Granted);
    }

    #[test]
    fn test_withdraw_only_from_submitted() {
        assert!(VersionStatus::Submitted
            .transition(VersionStatus::Withdrawn)
            .is_ok());
        assert!(VersionStatus::Draft
            .transition(VersionStatus::Withdrawn)
            .is_err());
    }

    #[test]
    fn test_granted_is_immutable() {
        for to in [
            VersionStatus::Draft,
            VersionStatus::Submitted,
            VersionStatus::Withdrawn,
            VersionStatus::Granted,
        ] {
            assert!(VersionStatus::Granted.transition(to).is_err());
        }
    }

    #[test]
    fn test_only_draft_editable() {
        assert!(VersionStatus::Draft.is_editable());
        assert!(!VersionStatus::Submitted.is_editable());
        assert!(!VersionStatus::Granted.is_editable());
    }
}
