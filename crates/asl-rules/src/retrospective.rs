//! # Retrospective Assessment Requirement
//!
//! A version is compulsorily subject to retrospective assessment (RA) when
//! any of the following hold:
//!
//! - it uses cats, dogs, equids, or non-human primates (by code, legacy
//!   code, or free-text "other species" label);
//! - a non-deleted protocol's severity contains "severe";
//! - `endangered-animals` is set;
//! - `training-licence` is set.
//!
//! The document's own `retrospectiveAssessment` field is an override shown
//! to users. It never changes [`ra_compulsory`], but a positive override
//! still makes RA [`ra_required`] for due-date purposes.

use chrono::{DateTime, Utc};
use serde_json::Value;

use asl_core::document::is_deleted;
use asl_core::temporal::add_months;
use asl_core::VersionData;

use crate::species::{label_for_code, label_for_legacy_code, legacy_labels, modern_codes, other_labels};

/// Months after expiry or revocation by which an RA is due.
pub const RA_DUE_MONTHS: u32 = 6;

/// Modern species codes whose use makes RA compulsory.
pub const RA_SPECIES: &[&str] = &[
    "cats",
    "dogs",
    "horses",
    "prosimians",
    "marmosets",
    "squirrel-monkeys",
    "cynomolgus",
    "rhesus",
    "vervets",
    "baboons",
    "other-old-world",
    "other-new-world",
    "other-nhps",
];

/// Legacy codes (by label) whose use makes RA compulsory.
const RA_LEGACY_CODES: &[u64] = &[7, 8, 10, 15, 16, 17, 18, 19, 20, 21, 22, 23];

/// Whether the species selection intersects the RA species set.
fn uses_ra_species(data: &VersionData) -> bool {
    // `modern_codes` drops `other-*` placeholders, so check the raw list too.
    let coded = data
        .array("species")
        .iter()
        .filter_map(Value::as_str)
        .any(|code| RA_SPECIES.contains(&code));
    if coded {
        return true;
    }

    let ra_labels: Vec<String> = RA_SPECIES
        .iter()
        .map(|code| label_for_code(code).to_lowercase())
        .chain(
            RA_LEGACY_CODES
                .iter()
                .filter_map(|c| label_for_legacy_code(*c))
                .map(str::to_lowercase),
        )
        .collect();
    let is_ra_label = |label: &str| ra_labels.contains(&label.to_lowercase());

    modern_codes(data).any(|code| is_ra_label(code))
        || other_labels(data).iter().any(|l| is_ra_label(l))
        || legacy_labels(data).iter().any(|l| is_ra_label(l))
}

/// Whether any live protocol is of severe severity.
fn has_severe_protocol(data: &VersionData) -> bool {
    data.protocols()
        .iter()
        .filter(|p| !is_deleted(p))
        .filter_map(|p| p.get("severity").and_then(Value::as_str))
        .any(|s| s.to_lowercase().contains("severe"))
}

/// The independently computed compulsory flag.
pub fn ra_compulsory(data: &VersionData) -> bool {
    uses_ra_species(data)
        || has_severe_protocol(data)
        || data.flag("endangered-animals")
        || data.flag("training-licence")
}

/// The document's explicit override, in either encoding.
///
/// Legacy documents store a bare boolean; newer ones an object with a
/// `retrospective-assessment-required` boolean.
pub fn ra_override(data: &VersionData) -> Option<bool> {
    match data.get("retrospectiveAssessment")? {
        Value::Bool(b) => Some(*b),
        Value::Object(obj) => obj
            .get("retrospective-assessment-required")
            .and_then(Value::as_bool),
        _ => None,
    }
}

/// Whether an RA due date applies.
pub fn ra_required(data: &VersionData) -> bool {
    ra_compulsory(data) || ra_override(data) == Some(true)
}

/// RA due date: six months after `anchor` if required.
pub fn ra_date(anchor: DateTime<Utc>, required: bool) -> Option<DateTime<Utc>> {
    required.then(|| add_months(anchor, RA_DUE_MONTHS))
}
