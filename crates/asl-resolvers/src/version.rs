//! # Project-Version Resolver
//!
//! Direct edits to a single version, addressed by version id:
//!
//! | Action              | Requires                | Effect                                        |
//! |---------------------|-------------------------|-----------------------------------------------|
//! | `patch`             | `draft`                 | merge top-level keys into the data            |
//! | `update-conditions` | not `granted`           | replace conditions, upsert reminder rows      |
//! | `withdraw`          | `submitted`             | status `withdrawn`                            |
//! | `delete`            | not `granted`           | soft-delete                                   |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::{ValidationError, VersionId};
use asl_rules::extract_reminders;
use asl_state::{LifecycleError, ReminderStatus, VersionStatus};
use asl_store::{Project, ProjectVersion, Reminder, Transaction};

use crate::error::ResolverError;
use crate::request::{opt_str, ChangeRequest, Context, Resolution};

/// Model name.
pub const MODEL: &str = "projectVersion";

/// Model type recorded on reminders attached to projects.
pub const REMINDER_MODEL_TYPE: &str = "project";

/// A decoded request against the `projectVersion` model.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionRequest {
    Patch { id: VersionId, data: Map<String, Value> },
    UpdateConditions {
        id: VersionId,
        conditions: Value,
        protocol_id: Option<String>,
    },
    Withdraw { id: VersionId },
    Delete { id: VersionId },
}

impl VersionRequest {
    pub fn decode(request: &ChangeRequest) -> Result<Self, ResolverError> {
        let action = request.action.as_str();
        if !matches!(action, "patch" | "update-conditions" | "withdraw" | "delete") {
            return Err(ResolverError::UnknownAction {
                model: MODEL.to_string(),
                action: action.to_string(),
            });
        }
        let id = VersionId::parse(request.require_id()?)?;
        let data = request.data_map();

        Ok(match action {
            "patch" => Self::Patch { id, data },
            "update-conditions" => Self::UpdateConditions {
                id,
                conditions: data.get("conditions").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
                protocol_id: opt_str(&data, "protocolId").map(str::to_string),
            },
            "withdraw" => Self::Withdraw { id },
            _ => Self::Delete { id },
        })
    }
}

fn wrong_state(action: &'static str, status: VersionStatus) -> ResolverError {
    LifecycleError::WrongState {
        record: "version",
        action,
        state: status.to_string(),
    }
    .into()
}

async fn load<T: Transaction>(tx: &mut T, id: VersionId) -> Result<(ProjectVersion, Project), ResolverError> {
    let version = tx
        .get_version(id)
        .await?
        .ok_or_else(|| ResolverError::not_found("version", id))?;
    let project = tx
        .get_project(version.project_id)
        .await?
        .ok_or_else(|| ResolverError::not_found("project", version.project_id))?;
    Ok((version, project))
}

fn resolution(project: &Project, id: VersionId, state: Value) -> Resolution {
    Resolution::new(id, Some(*project.establishment_id.as_uuid()), state)
}

/// Apply a `projectVersion` change request.
pub async fn resolve<T: Transaction>(
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    match VersionRequest::decode(request)? {
        VersionRequest::Patch { id, data } => {
            let (mut version, project) = load(tx, id).await?;
            if !version.status.is_editable() {
                return Err(wrong_state("patch", version.status));
            }
            version.data.merge(&data);
            version.updated_at = ctx.now;
            tx.update_version(&version).await?;
            Ok(resolution(&project, id, serde_json::to_value(&version)?))
        }
        VersionRequest::UpdateConditions {
            id,
            conditions,
            protocol_id,
        } => {
            let (mut version, project) = load(tx, id).await?;
            if version.status == VersionStatus::Granted {
                return Err(wrong_state("update conditions of", version.status));
            }
            set_conditions(&mut version, conditions, protocol_id.as_deref())?;
            version.updated_at = ctx.now;
            tx.update_version(&version).await?;
            upsert_reminders(tx, &project, &version, ctx.now).await?;
            Ok(resolution(&project, id, serde_json::to_value(&version)?))
        }
        VersionRequest::Withdraw { id } => {
            let (mut version, project) = load(tx, id).await?;
            version.status = version.status.transition(VersionStatus::Withdrawn)?;
            version.updated_at = ctx.now;
            tx.update_version(&version).await?;
            Ok(resolution(&project, id, serde_json::to_value(&version)?))
        }
        VersionRequest::Delete { id } => {
            let (mut version, project) = load(tx, id).await?;
            if version.status == VersionStatus::Granted {
                return Err(wrong_state("delete", version.status));
            }
            version.deleted = Some(ctx.now);
            version.updated_at = ctx.now;
            tx.update_version(&version).await?;
            let visible = tx.get_version(id).await?;
            Ok(resolution(&project, id, serde_json::to_value(visible)?))
        }
    }
}

/// Replace the top-level conditions, or those of one protocol.
fn set_conditions(version: &mut ProjectVersion, conditions: Value, protocol_id: Option<&str>) -> Result<(), ResolverError> {
    let Some(protocol_id) = protocol_id else {
        version.data.set("conditions", conditions);
        return Ok(());
    };
    let protocol = version
        .data
        .array_mut("protocols")
        .and_then(|protocols| {
            protocols
                .iter_mut()
                .find(|p| p.get("id").and_then(Value::as_str) == Some(protocol_id))
        })
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ResolverError::not_found("protocol", protocol_id))?;
    protocol.insert("conditions".into(), conditions);
    Ok(())
}

/// Write the reminder rows implied by the version's condition data.
///
/// Rows whose document id matches a stored reminder of this project update
/// it in place; the rest are inserted `pending`. An id held by another
/// record's reminder is rejected.
async fn upsert_reminders<T: Transaction>(
    tx: &mut T,
    project: &Project,
    version: &ProjectVersion,
    now: DateTime<Utc>,
) -> Result<(), ResolverError> {
    let extracted = extract_reminders(&version.data)?;
    for row in extracted {
        let deleted = row.deleted.then_some(now);
        let existing = match row.id {
            Some(id) => tx.get_reminder_including_deleted(id).await?,
            None => None,
        };
        match existing {
            Some(reminder) if reminder.model_id != *project.id.as_uuid() => {
                return Err(ValidationError::Invalid(format!(
                    "reminder {} belongs to another record",
                    reminder.id
                ))
                .into());
            }
            Some(mut reminder) => {
                reminder.condition_key = row.condition_key;
                reminder.deadline = row.deadline;
                reminder.deleted = deleted;
                tx.update_reminder(&reminder).await?;
            }
            None => {
                let reminder = Reminder {
                    id: row.id.unwrap_or_else(Uuid::new_v4),
                    model_type: REMINDER_MODEL_TYPE.to_string(),
                    model_id: *project.id.as_uuid(),
                    establishment_id: project.establishment_id,
                    condition_key: row.condition_key,
                    deadline: row.deadline,
                    status: ReminderStatus::Pending,
                    deleted,
                };
                tx.insert_reminder(&reminder).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "0b1e7f4c-5d43-4a2a-9b1a-1f2e3d4c5b6a";

    #[test]
    fn test_decode_update_conditions() {
        let req = ChangeRequest::new(MODEL, "update-conditions")
            .with_id(ID)
            .with_data(json!({"conditions": [{"key": "a"}], "protocolId": "p1"}));
        match VersionRequest::decode(&req).unwrap() {
            VersionRequest::UpdateConditions {
                conditions,
                protocol_id,
                ..
            } => {
                assert_eq!(conditions, json!([{"key": "a"}]));
                assert_eq!(protocol_id.as_deref(), Some("p1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        let req = ChangeRequest::new(MODEL, "grant").with_id(ID);
        assert_eq!(VersionRequest::decode(&req).unwrap_err().kind(), "unknown_action");
    }

    #[test]
    fn test_set_protocol_conditions() {
        let data = json!({"protocols": [{"id": "p1", "title": "one"}, {"id": "p2"}]});
        let mut version = ProjectVersion::draft(asl_core::ProjectId::new(), data.into(), Utc::now());
        set_conditions(&mut version, json!([{"key": "k"}]), Some("p2")).unwrap();
        assert_eq!(version.data.protocols()[1]["conditions"], json!([{"key": "k"}]));
        assert!(version.data.protocols()[0].get("conditions").is_none());
    }

    #[test]
    fn test_set_conditions_unknown_protocol() {
        let mut version = ProjectVersion::draft(asl_core::ProjectId::new(), json!({}).into(), Utc::now());
        let err = set_conditions(&mut version, json!([]), Some("nope")).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
