//! # Generic Record Resolver
//!
//! The create/update/soft-delete contract for every model that does not
//! branch on lifecycle state. A [`Schema`] declares the model name, the
//! allow-listed fields, and a JSON Schema (Draft 2020-12) the filtered data
//! must satisfy.
//!
//! Filtering is allow-list only: undeclared fields are dropped silently,
//! never rejected.

use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::ValidationError;
use asl_store::{GenericRecord, Transaction};

use crate::error::ResolverError;
use crate::licence_number::{self, LicenceKind};
use crate::request::{ChangeRequest, Context, Resolution};

/// Static description of a simple model.
#[derive(Debug)]
pub struct Schema {
    /// Model name as it appears in change requests.
    pub model: &'static str,
    /// Fields accepted from `data`.
    pub fields: &'static [&'static str],
    /// JSON Schema source for the stored data.
    pub json_schema: &'static str,
    /// Records of this model carry a generated licence number.
    pub licence: Option<LicenceKind>,
}

impl Schema {
    /// Keep only declared fields.
    pub fn filter(&self, data: &Map<String, Value>) -> Map<String, Value> {
        data.iter()
            .filter(|(k, _)| self.fields.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Validate `data` against the model's JSON Schema.
    pub fn validate(&self, data: &Map<String, Value>) -> Result<(), ValidationError> {
        let schema: Value = serde_json::from_str(self.json_schema)
            .map_err(|e| ValidationError::Invalid(format!("{} schema does not parse: {e}", self.model)))?;
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&schema)
            .map_err(|e| ValidationError::Invalid(format!("{} schema does not compile: {e}", self.model)))?;

        let instance = Value::Object(data.clone());
        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Schema {
                model: self.model.to_string(),
                violations: violations.join("; "),
            })
        }
    }
}

fn establishment_of(record: &GenericRecord) -> Option<Uuid> {
    if record.model == "establishment" {
        return Some(record.id);
    }
    record.str("establishmentId").and_then(|s| Uuid::parse_str(s).ok())
}

fn resolution(record: &GenericRecord) -> Result<Resolution, ResolverError> {
    Ok(Resolution::new(
        record.id,
        establishment_of(record),
        serde_json::to_value(record)?,
    ))
}

/// Apply `request` to a simple model.
pub async fn resolve<T: Transaction>(
    schema: &Schema,
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    match request.action.as_str() {
        "create" => create(schema, tx, request, ctx).await,
        "update" => update(schema, tx, request, ctx).await,
        "delete" => delete(schema, tx, request, ctx).await,
        other => Err(ResolverError::UnknownAction {
            model: schema.model.to_string(),
            action: other.to_string(),
        }),
    }
}

async fn create<T: Transaction>(
    schema: &Schema,
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let raw = request.data_map();
    let id = match raw.get("id").and_then(Value::as_str) {
        Some(s) => Uuid::parse_str(s).map_err(|_| ValidationError::InvalidIdentifier {
            kind: "record",
            value: s.to_string(),
        })?,
        None => Uuid::new_v4(),
    };

    let mut data = schema.filter(&raw);
    if let Some(kind) = schema.licence {
        if !data.contains_key("licenceNumber") {
            let number = licence_number::generate(tx, kind).await?;
            data.insert("licenceNumber".into(), Value::String(number));
        }
    }
    schema.validate(&data)?;

    let record = GenericRecord {
        id,
        model: schema.model.to_string(),
        data,
        created_at: ctx.now,
        updated_at: ctx.now,
        deleted: None,
    };
    tx.insert_record(&record).await?;
    tracing::debug!(model = schema.model, id = %record.id, "record created");
    resolution(&record)
}

async fn update<T: Transaction>(
    schema: &Schema,
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let id = request.require_uuid()?;
    let mut record = tx
        .get_record(schema.model, id)
        .await?
        .ok_or_else(|| ResolverError::not_found("record", id))?;

    for (k, v) in schema.filter(&request.data_map()) {
        record.data.insert(k, v);
    }
    schema.validate(&record.data)?;
    record.updated_at = ctx.now;
    tx.update_record(&record).await?;
    resolution(&record)
}

async fn delete<T: Transaction>(
    schema: &Schema,
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let id = request.require_uuid()?;
    let mut record = tx
        .get_record(schema.model, id)
        .await?
        .ok_or_else(|| ResolverError::not_found("record", id))?;
    record.deleted = Some(ctx.now);
    record.updated_at = ctx.now;
    tx.update_record(&record).await?;

    // The default view no longer sees it.
    let visible = tx.get_record(schema.model, id).await?;
    Ok(Resolution {
        model_id: Some(id),
        establishment_id: establishment_of(&record),
        state: serde_json::to_value(visible)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::PLACE;
    use serde_json::json;

    #[test]
    fn filter_drops_undeclared_fields() {
        let data = json!({"site": "A", "name": "Room 1", "bogus": true});
        let filtered = PLACE.filter(data.as_object().unwrap());
        assert!(filtered.contains_key("site"));
        assert!(!filtered.contains_key("bogus"));
    }

    #[test]
    fn validate_reports_instance_path() {
        let data = json!({"site": 7, "name": "Room", "establishmentId": "x"});
        let err = PLACE.validate(data.as_object().unwrap()).unwrap_err();
        match err {
            ValidationError::Schema { model, violations } => {
                assert_eq!(model, "place");
                assert!(violations.contains("/site"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
