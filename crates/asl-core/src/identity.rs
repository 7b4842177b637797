//! # Identity Newtypes
//!
//! UUID-backed identifiers for the records the lifecycle engine joins
//! across: projects, versions, establishments, and profiles. Each is a
//! distinct type, always valid by construction, and serializes as a bare
//! UUID string.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an identifier from its hyphenated string form.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                Uuid::from_str(value)
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier {
                        kind: $label,
                        value: value.to_string(),
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_identifier!(
    /// A licence application (project) root record.
    ProjectId,
    "project"
);

uuid_identifier!(
    /// A single snapshot of a project's structured data.
    VersionId,
    "project version"
);

uuid_identifier!(
    /// A regulated site or organisation that holds licences.
    EstablishmentId,
    "establishment"
);

uuid_identifier!(
    /// A person known to the platform: applicants, licence holders, inspectors.
    ProfileId,
    "profile"
);
