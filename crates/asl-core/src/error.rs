//! # Validation Errors
//!
//! Errors raised while interpreting untyped input: identifiers, dates, and
//! record payloads that fail their declared shape. Higher layers wrap these
//! in their own error enums with `#[from]`.

use thiserror::Error;

/// A value from an inbound change request did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was not a UUID.
    #[error("invalid {kind} identifier: \"{value}\"")]
    InvalidIdentifier {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A date was neither RFC 3339 nor `YYYY-MM-DD`.
    #[error("invalid date: \"{0}\" (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDate(String),

    /// A required field was absent.
    #[error("missing required field \"{0}\"")]
    MissingField(&'static str),

    /// A record payload failed its schema.
    #[error("{model} failed validation: {violations}")]
    Schema {
        /// The model being written.
        model: String,
        /// Human-readable list of violations.
        violations: String,
    },

    /// Any other rejected value, described in words.
    #[error("{0}")]
    Invalid(String),
}
