//! Schemas for the simple models handled by the generic resolver.

use crate::generic::Schema;
use crate::licence_number::LicenceKind;

pub static ESTABLISHMENT: Schema = Schema {
    model: "establishment",
    fields: &["name", "address", "country", "licenceNumber", "status", "issueDate", "revocationDate", "conditions", "corporateStatus"],
    json_schema: r#"{
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "address": {"type": ["string", "null"]},
            "country": {"enum": ["england", "scotland", "wales", "ni"]},
            "licenceNumber": {"type": "string"},
            "status": {"enum": ["inactive", "active", "revoked", "suspended"]},
            "issueDate": {"type": ["string", "null"]},
            "revocationDate": {"type": ["string", "null"]},
            "conditions": {"type": ["string", "null"]},
            "corporateStatus": {"type": ["string", "null"]}
        }
    }"#,
    licence: Some(LicenceKind::Establishment),
};

pub static PROFILE: Schema = Schema {
    model: "profile",
    fields: &["firstName", "lastName", "email", "telephone", "dob", "asruUser", "asruAdmin", "asruLicensing", "asruInspector"],
    json_schema: r#"{
        "type": "object",
        "required": ["firstName", "lastName", "email"],
        "properties": {
            "firstName": {"type": "string", "minLength": 1},
            "lastName": {"type": "string", "minLength": 1},
            "email": {"type": "string", "minLength": 3},
            "telephone": {"type": ["string", "null"]},
            "dob": {"type": ["string", "null"]},
            "asruUser": {"type": "boolean"},
            "asruAdmin": {"type": "boolean"},
            "asruLicensing": {"type": "boolean"},
            "asruInspector": {"type": "boolean"}
        }
    }"#,
    licence: None,
};

pub static PERMISSION: Schema = Schema {
    model: "permission",
    fields: &["profileId", "establishmentId", "role"],
    json_schema: r#"{
        "type": "object",
        "required": ["profileId", "establishmentId", "role"],
        "properties": {
            "profileId": {"type": "string"},
            "establishmentId": {"type": "string"},
            "role": {"enum": ["basic", "read", "admin"]}
        }
    }"#,
    licence: None,
};

pub static PIL: Schema = Schema {
    model: "pil",
    fields: &["profileId", "establishmentId", "licenceNumber", "status", "issueDate", "revocationDate", "procedures", "species", "conditions"],
    json_schema: r#"{
        "type": "object",
        "required": ["profileId", "establishmentId"],
        "properties": {
            "profileId": {"type": "string"},
            "establishmentId": {"type": "string"},
            "licenceNumber": {"type": "string"},
            "status": {"enum": ["pending", "active", "revoked", "suspended"]},
            "issueDate": {"type": ["string", "null"]},
            "revocationDate": {"type": ["string", "null"]},
            "procedures": {"type": "array", "items": {"type": "string"}},
            "species": {"type": "array", "items": {"type": "string"}},
            "conditions": {"type": ["string", "null"]}
        }
    }"#,
    licence: Some(LicenceKind::Personal),
};

pub static TRAINING_COURSE: Schema = Schema {
    model: "trainingCourse",
    fields: &["establishmentId", "projectId", "title", "startDate", "species"],
    json_schema: r#"{
        "type": "object",
        "required": ["establishmentId", "title"],
        "properties": {
            "establishmentId": {"type": "string"},
            "projectId": {"type": ["string", "null"]},
            "title": {"type": "string", "minLength": 1},
            "startDate": {"type": ["string", "null"]},
            "species": {"type": "array", "items": {"type": "string"}}
        }
    }"#,
    licence: None,
};

pub static TRAINING_PIL: Schema = Schema {
    model: "trainingPil",
    fields: &["trainingCourseId", "profileId", "licenceNumber", "status", "issueDate", "expiryDate", "revocationDate"],
    json_schema: r#"{
        "type": "object",
        "required": ["trainingCourseId", "profileId"],
        "properties": {
            "trainingCourseId": {"type": "string"},
            "profileId": {"type": "string"},
            "licenceNumber": {"type": "string"},
            "status": {"enum": ["inactive", "active", "revoked", "expired"]},
            "issueDate": {"type": ["string", "null"]},
            "expiryDate": {"type": ["string", "null"]},
            "revocationDate": {"type": ["string", "null"]}
        }
    }"#,
    licence: Some(LicenceKind::Personal),
};

pub static CERTIFICATE: Schema = Schema {
    model: "certificate",
    fields: &["profileId", "certificateNumber", "accreditingBody", "otherAccreditingBody", "passDate", "modules", "species"],
    json_schema: r#"{
        "type": "object",
        "required": ["profileId"],
        "properties": {
            "profileId": {"type": "string"},
            "certificateNumber": {"type": ["string", "null"]},
            "accreditingBody": {"type": ["string", "null"]},
            "otherAccreditingBody": {"type": ["string", "null"]},
            "passDate": {"type": ["string", "null"]},
            "modules": {"type": "array", "items": {"type": "string"}},
            "species": {"type": "array", "items": {"type": "string"}}
        }
    }"#,
    licence: None,
};

pub static EXEMPTION: Schema = Schema {
    model: "exemption",
    fields: &["profileId", "module", "species", "description"],
    json_schema: r#"{
        "type": "object",
        "required": ["profileId", "module"],
        "properties": {
            "profileId": {"type": "string"},
            "module": {"type": "string", "minLength": 1},
            "species": {"type": "array", "items": {"type": "string"}},
            "description": {"type": ["string", "null"]}
        }
    }"#,
    licence: None,
};

pub static PLACE: Schema = Schema {
    model: "place",
    fields: &["establishmentId", "site", "area", "name", "suitability", "holding", "notes", "restrictions"],
    json_schema: r#"{
        "type": "object",
        "required": ["establishmentId", "site", "name"],
        "properties": {
            "establishmentId": {"type": "string"},
            "site": {"type": "string", "minLength": 1},
            "area": {"type": ["string", "null"]},
            "name": {"type": "string", "minLength": 1},
            "suitability": {"type": "array", "items": {"type": "string"}},
            "holding": {"type": "array", "items": {"type": "string"}},
            "notes": {"type": ["string", "null"]},
            "restrictions": {"type": ["string", "null"]}
        }
    }"#,
    licence: None,
};

pub static ROLE: Schema = Schema {
    model: "role",
    fields: &["establishmentId", "profileId", "type"],
    json_schema: r#"{
        "type": "object",
        "required": ["establishmentId", "profileId", "type"],
        "properties": {
            "establishmentId": {"type": "string"},
            "profileId": {"type": "string"},
            "type": {"enum": ["pelh", "nacwo", "nvs", "nio", "ntco", "holc", "sqp", "nprc"]}
        }
    }"#,
    licence: None,
};

/// Every simple model.
pub static ALL: [&Schema; 10] = [
    &ESTABLISHMENT,
    &PROFILE,
    &PERMISSION,
    &PIL,
    &TRAINING_COURSE,
    &TRAINING_PIL,
    &CERTIFICATE,
    &EXEMPTION,
    &PLACE,
    &ROLE,
];

/// The schema registered for `model`.
pub fn lookup(model: &str) -> Option<&'static Schema> {
    ALL.iter().copied().find(|s| s.model == model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn every_schema_compiles() {
        for schema in ALL {
            // An empty object either passes or fails on `required`; a broken
            // schema source surfaces as `Invalid` instead.
            match schema.validate(&Map::new()) {
                Ok(()) | Err(asl_core::ValidationError::Schema { .. }) => {}
                Err(other) => panic!("{} schema is broken: {other}", schema.model),
            }
        }
    }

    #[test]
    fn every_field_is_described() {
        for schema in ALL {
            let source: serde_json::Value = serde_json::from_str(schema.json_schema).unwrap();
            let props = source["properties"].as_object().unwrap();
            for field in schema.fields {
                assert!(props.contains_key(*field), "{}.{field} has no schema", schema.model);
            }
        }
    }

    #[test]
    fn lookup_by_model_name() {
        assert_eq!(lookup("trainingPil").map(|s| s.model), Some("trainingPil"));
        assert!(lookup("project").is_none());
    }
}
