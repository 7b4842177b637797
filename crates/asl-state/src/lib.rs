//! # asl-state — Lifecycle States and Transition Guards
//!
//! The status enums of every versioned record in the engine, and the rules
//! for which transitions between them are legal.
//!
//! ## State Machines
//!
//! - **Project** (`project.rs`): `inactive → active → {revoked, expired, transferred}`.
//!   Legacy stubs may be created directly as `active` or `expired`.
//!
//! - **Version** (`version.rs`): `draft → submitted → {granted, withdrawn}`, with
//!   `draft → granted` reserved for legacy stub conversion.
//!
//! - **Retrospective assessment** (`retrospective.rs`): `draft → submitted → granted`,
//!   with `draft → granted` when a regulator overrides submission.
//!
//! - **Additional availability** (`availability.rs`): `draft → active ⇄ removed`.
//!
//! - **Reminder** (`reminder.rs`): `pending → active`.
//!
//! ## Design
//!
//! Statuses are persisted as lowercase strings and round-trip through
//! `as_str` / `FromStr`. The guards here are pure: they never touch storage,
//! and the resolvers call them before any write so a rejected transition
//! leaves the transaction untouched.

use thiserror::Error;

/// Generates `as_str`, `Display`, and `FromStr` for a status enum whose
/// variants persist as fixed lowercase strings.
macro_rules! status_strings {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// The persisted string form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err($crate::UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod availability;
pub mod project;
pub mod reminder;
pub mod retrospective;
pub mod version;

pub use availability::AvailabilityStatus;
pub use project::ProjectStatus;
pub use reminder::ReminderStatus;
pub use retrospective::RaStatus;
pub use version::VersionStatus;

// ─── Errors ──────────────────────────────────────────────────────────

/// A lifecycle rule was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid {record} transition: {from} -> {to}")]
    InvalidTransition {
        /// Which kind of record.
        record: &'static str,
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// An action requires a state the record is not in.
    #[error("cannot {action} {record} in state {state}")]
    WrongState {
        /// Which kind of record.
        record: &'static str,
        /// The action attempted.
        action: &'static str,
        /// The state the record is actually in.
        state: String,
    },
}

/// A persisted status string did not match any known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} status \"{value}\"")]
pub struct UnknownStatus {
    /// Which status enum was being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}
