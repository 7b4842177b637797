//! Reminder resolver: the generic create/update/delete contract over typed
//! reminder rows, plus `dismiss`.

use std::str::FromStr;

use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::temporal::parse_date;
use asl_core::{EstablishmentId, ValidationError};
use asl_state::ReminderStatus;
use asl_store::{Reminder, ReminderDismissal, Transaction};

use crate::error::ResolverError;
use crate::request::{opt_str, req_str, ChangeRequest, Context, Resolution};
use crate::version::REMINDER_MODEL_TYPE;

/// Model name.
pub const MODEL: &str = "reminder";

fn resolution(reminder: &Reminder, state: Value) -> Resolution {
    Resolution::new(reminder.id, Some(*reminder.establishment_id.as_uuid()), state)
}

fn status(data: &Map<String, Value>) -> Result<Option<ReminderStatus>, ValidationError> {
    opt_str(data, "status")
        .map(|s| ReminderStatus::from_str(s).map_err(|e| ValidationError::Invalid(e.to_string())))
        .transpose()
}

async fn load<T: Transaction>(tx: &mut T, request: &ChangeRequest) -> Result<Reminder, ResolverError> {
    let id = request.require_uuid()?;
    tx.get_reminder(id)
        .await?
        .ok_or_else(|| ResolverError::not_found("reminder", id))
}

/// Apply a `reminder` change request.
pub async fn resolve<T: Transaction>(
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let data = request.data_map();
    match request.action.as_str() {
        "create" => {
            let model_id = req_str(&data, "modelId")?;
            let reminder = Reminder {
                id: Uuid::new_v4(),
                model_type: opt_str(&data, "modelType").unwrap_or(REMINDER_MODEL_TYPE).to_string(),
                model_id: Uuid::parse_str(model_id).map_err(|_| ValidationError::InvalidIdentifier {
                    kind: "record",
                    value: model_id.to_string(),
                })?,
                establishment_id: EstablishmentId::parse(req_str(&data, "establishmentId")?)?,
                condition_key: req_str(&data, "conditionKey")?.to_string(),
                deadline: parse_date(req_str(&data, "deadline")?)?,
                status: status(&data)?.unwrap_or(ReminderStatus::Pending),
                deleted: None,
            };
            tx.insert_reminder(&reminder).await?;
            Ok(resolution(&reminder, serde_json::to_value(&reminder)?))
        }
        "update" => {
            let mut reminder = load(tx, request).await?;
            if let Some(key) = opt_str(&data, "conditionKey") {
                reminder.condition_key = key.to_string();
            }
            if let Some(deadline) = opt_str(&data, "deadline") {
                reminder.deadline = parse_date(deadline)?;
            }
            if let Some(status) = status(&data)? {
                reminder.status = status;
            }
            tx.update_reminder(&reminder).await?;
            Ok(resolution(&reminder, serde_json::to_value(&reminder)?))
        }
        "delete" => {
            let mut reminder = load(tx, request).await?;
            reminder.deleted = Some(ctx.now);
            tx.update_reminder(&reminder).await?;
            let visible = tx.get_reminder(reminder.id).await?;
            Ok(resolution(&reminder, serde_json::to_value(visible)?))
        }
        "dismiss" => {
            let reminder = load(tx, request).await?;
            let profile_id = ctx.actor.ok_or(ValidationError::MissingField("changedBy"))?;
            let dismissal = ReminderDismissal {
                id: Uuid::new_v4(),
                reminder_id: reminder.id,
                profile_id,
                created_at: ctx.now,
            };
            tx.insert_dismissal(&dismissal).await?;
            Ok(resolution(&reminder, serde_json::to_value(&dismissal)?))
        }
        other => Err(ResolverError::UnknownAction {
            model: MODEL.to_string(),
            action: other.to_string(),
        }),
    }
}
