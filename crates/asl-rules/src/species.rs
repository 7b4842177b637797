//! # Species Extraction
//!
//! Projects cache a flat list of species labels for search and reporting.
//! Two document shapes exist:
//!
//! - **Modern** (`schemaVersion >= 1`): `species` holds coded values such as
//!   `"mice"`; free-text labels live in any key beginning `species-other`.
//! - **Legacy** (`schemaVersion == 0`): each protocol carries a `species`
//!   list of `{speciesId, "other-species-type"?}` items with numeric codes.

use serde_json::Value;

use asl_core::document::is_deleted;
use asl_core::VersionData;

/// Modern species codes and their display labels.
pub const SPECIES: &[(&str, &str)] = &[
    ("mice", "Mice"),
    ("rats", "Rats"),
    ("guinea-pigs", "Guinea pigs"),
    ("hamsters", "Hamsters"),
    ("gerbils", "Gerbils"),
    ("rabbits", "Rabbits"),
    ("cats", "Cats"),
    ("dogs", "Dogs"),
    ("ferrets", "Ferrets"),
    ("horses", "Horses and other equids"),
    ("pigs", "Pigs"),
    ("minipigs", "Minipigs"),
    ("goats", "Goats"),
    ("sheep", "Sheep"),
    ("cattle", "Cattle"),
    ("prosimians", "Prosimians"),
    ("marmosets", "Marmosets and tamarins"),
    ("squirrel-monkeys", "Squirrel monkeys"),
    ("cynomolgus", "Cynomolgus macaques"),
    ("rhesus", "Rhesus macaques"),
    ("vervets", "Vervets"),
    ("baboons", "Baboons"),
    ("quail", "Japanese quail"),
    ("domestic-fowl", "Domestic fowl"),
    ("reptiles", "Reptiles"),
    ("xenopus", "Xenopus"),
    ("rana", "Rana"),
    ("zebra-fish", "Zebra fish"),
    ("cephalopods", "Cephalopods"),
];

/// Legacy numeric species codes and their labels. Code 0 means "other",
/// labelled by the item's `other-species-type`.
pub const LEGACY_SPECIES: &[(u64, &str)] = &[
    (1, "Mice"),
    (2, "Rats"),
    (3, "Guinea pigs"),
    (4, "Hamsters"),
    (5, "Gerbils"),
    (6, "Rabbits"),
    (7, "Cats"),
    (8, "Dogs"),
    (9, "Ferrets"),
    (10, "Horses and other equids"),
    (11, "Pigs"),
    (12, "Goats"),
    (13, "Sheep"),
    (14, "Cattle"),
    (15, "Prosimians"),
    (16, "Marmosets and tamarins"),
    (17, "Squirrel monkeys"),
    (18, "Cynomolgus macaques"),
    (19, "Rhesus macaques"),
    (20, "Vervets"),
    (21, "Baboons"),
    (22, "Other old world monkeys"),
    (23, "Other new world monkeys"),
    (24, "Japanese quail"),
    (25, "Domestic fowl"),
    (26, "Reptiles"),
    (27, "Xenopus"),
    (28, "Zebra fish"),
    (29, "Cephalopods"),
];

/// Label for a modern code; unknown codes pass through verbatim.
pub fn label_for_code(code: &str) -> &str {
    SPECIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

/// Label for a legacy numeric code.
pub fn label_for_legacy_code(code: u64) -> Option<&'static str> {
    LEGACY_SPECIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Extract the species cache for a version.
///
/// Labels are de-duplicated in first-seen order.
pub fn extract_species(data: &VersionData, schema_version: i32) -> Vec<String> {
    let labels = if schema_version == 0 {
        legacy_labels(data)
    } else {
        modern_codes(data)
            .map(|code| label_for_code(code).to_string())
            .chain(other_labels(data))
            .collect()
    };
    dedupe(labels)
}

/// Coded values from the modern `species` field, excluding the `other-*`
/// placeholders whose labels live elsewhere.
pub(crate) fn modern_codes(data: &VersionData) -> impl Iterator<Item = &str> {
    data.array("species")
        .iter()
        .filter_map(Value::as_str)
        .filter(|code| !code.starts_with("other"))
}

/// Free-text labels from every `species-other*` key.
pub(crate) fn other_labels(data: &VersionData) -> Vec<String> {
    data.as_map()
        .iter()
        .filter(|(key, _)| key.starts_with("species-other"))
        .flat_map(|(_, value)| match value {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect::<Vec<_>>(),
            Value::String(s) => vec![s.as_str()],
            _ => Vec::new(),
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Labels from protocol-embedded legacy species items.
pub(crate) fn legacy_labels(data: &VersionData) -> Vec<String> {
    data.protocols()
        .iter()
        .filter(|p| !is_deleted(p))
        .flat_map(|p| {
            p.get("species")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        })
        .filter_map(|item| {
            let code = item.get("speciesId").and_then(Value::as_u64);
            match code.and_then(label_for_legacy_code) {
                Some(label) => Some(label.to_string()),
                None => item
                    .get("other-species-type")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }
        })
        .collect()
}

fn dedupe(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}
