//! # Project Status
//!
//! ```text
//! inactive ──grant──▶ active ──revoke──▶ revoked
//!                       │  ├──expire───▶ expired
//!                       │  └─transfer──▶ transferred
//!                       └─(amend: stays active)
//! ```
//!
//! A project becomes `active` only by granting a version (or by being
//! created as a current legacy stub). The three right-hand states are
//! terminal for the project record; a transfer continues on a new project.

use serde::{Deserialize, Serialize};

use crate::LifecycleError;

/// The lifecycle state of a project (licence application).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Drafting; no version has been granted yet.
    Inactive,
    /// Holds a granted version and is within its licence period.
    Active,
    /// Moved to another establishment; superseded by a new project.
    Transferred,
    /// Permanently revoked by the regulator.
    Revoked,
    /// The licence period has ended.
    Expired,
}

status_strings!(ProjectStatus, "project", {
    Inactive => "inactive",
    Active => "active",
    Transferred => "transferred",
    Revoked => "revoked",
    Expired => "expired",
});

impl ProjectStatus {
    /// Whether no further lifecycle transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transferred | Self::Revoked | Self::Expired)
    }

    /// Require the project to be in `expected` before performing `action`.
    pub fn require(&self, expected: Self, action: &'static str) -> Result<(), LifecycleError> {
        if *self == expected {
            Ok(())
        } else {
            Err(LifecycleError::WrongState {
                record: "project",
                action,
                state: self.to_string(),
            })
        }
    }

    /// Validate a transition to `to`.
    ///
    /// Granting an amendment keeps an active project active, so
    /// `active → active` is legal.
    pub fn transition(self, to: Self) -> Result<Self, LifecycleError> {
        let ok = match (self, to) {
            (Self::Inactive, Self::Active) => true,
            (Self::Inactive, Self::Expired) => true,
            (Self::Active, Self::Active) => true,
            (Self::Active, Self::Revoked | Self::Expired | Self::Transferred) => true,
            _ => false,
        };
        if ok {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition {
                record: "project",
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_trip_strings() {
        for s in [
            ProjectStatus::Inactive,
            ProjectStatus::Active,
            ProjectStatus::Transferred,
            ProjectStatus::Revoked,
            ProjectStatus::Expired,
        ] {
            assert_eq!(ProjectStatus::from_str(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = ProjectStatus::from_str("suspended").unwrap_err();
        assert_eq!(err.value, "suspended");
        assert_eq!(err.kind, "project");
    }

    #[test]
    fn test_grant_from_inactive() {
        assert_eq!(
            ProjectStatus::Inactive.transition(ProjectStatus::Active),
            Ok(ProjectStatus::Active)
        );
    }

    #[test]
    fn test_amendment_keeps_active() {
        assert!(ProjectStatus::Active.transition(ProjectStatus::Active).is_ok());
    }

    #[test]
    fn test_cannot_revoke_expired() {
        let err = ProjectStatus::Expired
            .transition(ProjectStatus::Revoked)
            .unwrap_err();
        assert!(err.to_string().contains("expired -> revoked"));
    }

    #[test]
    fn test_cannot_revoke_inactive() {
        assert!(ProjectStatus::Inactive
            .transition(ProjectStatus::Revoked)
            .is_err());
    }

    #[test]
    fn test_require_reports_action() {
        let err = ProjectStatus::Revoked
            .require(ProjectStatus::Active, "revoke")
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot revoke project in state revoked");
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProjectStatus::Revoked.is_terminal());
        assert!(ProjectStatus::Expired.is_terminal());
        assert!(ProjectStatus::Transferred.is_terminal());
        assert!(!ProjectStatus::Active.is_terminal());
        assert!(!ProjectStatus::Inactive.is_terminal());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ProjectStatus::Transferred).unwrap();
        assert_eq!(json, "\"transferred\"");
    }
}
