//! # Resolver Errors
//!
//! Every error a resolver raises aborts the enclosing transaction. The
//! processor records the rendered message and its source chain in the
//! changelog.

use thiserror::Error;

use asl_core::ValidationError;
use asl_state::LifecycleError;
use asl_store::StoreError;

/// A change request could not be applied.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// No resolver is registered for the model name.
    #[error("unknown model \"{0}\"")]
    UnknownModel(String),

    /// The model's resolver has no such action.
    #[error("unknown action \"{action}\" for model \"{model}\"")]
    UnknownAction {
        /// The model addressed.
        model: String,
        /// The rejected action.
        action: String,
    },

    /// A mutating action arrived without the identifier it needs.
    #[error("{model} {action} requires an id")]
    MissingId {
        /// The model addressed.
        model: String,
        /// The action attempted.
        action: String,
    },

    /// The addressed record does not exist (or is deleted).
    #[error("{kind} {id} not found")]
    NotFound {
        /// Which kind of record.
        kind: &'static str,
        /// The identifier looked up.
        id: String,
    },

    /// The record is not in the lifecycle state the action needs.
    #[error("invalid state: {0}")]
    InvalidState(#[from] LifecycleError),

    /// The payload failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A cross-record association check failed.
    #[error("profile {profile} is not associated with establishment {establishment}")]
    NotAssociated {
        /// The licence holder.
        profile: String,
        /// The establishment requested.
        establishment: String,
    },

    /// The request body could not be decoded.
    #[error("undecodable request payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The store failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl ResolverError {
    /// Shorthand for [`ResolverError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// A short machine-readable name for metrics labels and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "unknown_model",
            Self::UnknownAction { .. } => "unknown_action",
            Self::MissingId { .. } => "missing_id",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Validation(_) => "validation",
            Self::NotAssociated { .. } => "not_associated",
            Self::Payload(_) => "payload",
            Self::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_convert_to_invalid_state() {
        let err: ResolverError = LifecycleError::WrongState {
            record: "version",
            action: "grant",
            state: "draft".into(),
        }
        .into();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(err.to_string(), "invalid state: cannot grant version in state draft");
    }

    #[test]
    fn validation_errors_keep_detail() {
        let err: ResolverError = ValidationError::MissingField("establishmentId").into();
        assert!(err.to_string().contains("establishmentId"));
    }
}
