//! # Retrospective Assessment Status
//!
//! Parallel to the version lifecycle, minus withdrawal. A regulator may
//! grant a draft directly.

use serde::{Deserialize, Serialize};

use crate::LifecycleError;

/// The lifecycle state of a retrospective assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaStatus {
    /// Being written.
    Draft,
    /// Sent to the regulator.
    Submitted,
    /// Accepted.
    Granted,
}

status_strings!(RaStatus, "retrospective assessment", {
    Draft => "draft",
    Submitted => "submitted",
    Granted => "granted",
});

impl RaStatus {
    /// Validate submission.
    pub fn submit(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Draft => Ok(Self::Submitted),
            other => Err(invalid(other, Self::Submitted)),
        }
    }

    /// Validate a grant. `regulator_override` allows granting a draft.
    pub fn grant(self, regulator_override: bool) -> Result<Self, LifecycleError> {
        match self {
            Self::Submitted => Ok(Self::Granted),
            Self::Draft if regulator_override => Ok(Self::Granted),
            other => Err(invalid(other, Self::Granted)),
        }
    }
}

fn invalid(from: RaStatus, to: RaStatus) -> LifecycleError {
    LifecycleError::InvalidTransition {
        record: "retrospective assessment",
        from: from.to_string(),
        to: to.to_string(),
    }
}
