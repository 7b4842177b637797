//! Transfers between establishments.
//!
//! A licence transfer produces a new project at the destination and retires
//! the old one as `transferred`. The licence number moves with it: the old
//! row is marked `transferred` before the new row is inserted, so the number
//! is never held by two live projects.

use serde_json::{Map, Value};

use asl_core::{EstablishmentId, ProjectId, ValidationError};
use asl_rules::{condition_keys, ra_compulsory};
use asl_state::{LifecycleError, ProjectStatus, VersionStatus};
use asl_store::{Project, ProjectVersion, Transaction};

use crate::error::ResolverError;
use crate::project::{is_asru, latest_version, load, reminders, sites};
use crate::request::Context;

/// Transfer a licence whose latest version (carrying the transfer request)
/// is submitted. Returns the new project.
pub async fn transfer<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    destination: Option<EstablishmentId>,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let mut old = load(tx, id).await?;
    let version = latest_version(tx, id).await?;
    if version.status != VersionStatus::Submitted {
        return Err(LifecycleError::WrongState {
            record: "version",
            action: "transfer",
            state: version.status.to_string(),
        }
        .into());
    }
    let destination = match destination {
        Some(d) => d,
        None => match version.data.transfer_destination() {
            Some(raw) => EstablishmentId::parse(raw)?,
            None => return Err(ValidationError::MissingField("establishmentId").into()),
        },
    };
    let retired = old.status.transition(ProjectStatus::Transferred)?;

    let mut data = version.data.clone();
    data.strip_transfer_markers();

    let mut new = old.clone();
    new.id = ProjectId::new();
    new.status = ProjectStatus::Active;
    new.establishment_id = destination;
    new.previous_establishment_id = Some(old.establishment_id);
    new.previous_project_id = Some(old.id);
    new.transferred_in_date = Some(ctx.now);
    new.transfer_establishment_id = None;
    new.transfer_project_id = None;
    new.transferred_out_date = None;
    new.title = data.title().map(str::to_string).or(new.title);
    new.created_at = ctx.now;
    new.updated_at = ctx.now;

    old.status = retired;
    old.transfer_establishment_id = Some(destination);
    old.transfer_project_id = Some(new.id);
    old.transferred_out_date = Some(ctx.now);
    old.updated_at = ctx.now;
    tx.update_project(&old).await?;
    tx.insert_project(&new).await?;

    let mut clone = ProjectVersion::draft(new.id, data, ctx.now);
    clone.status = VersionStatus::Granted;
    clone.ra_compulsory = ra_compulsory(&clone.data);
    clone.asru_version = is_asru(tx, ctx.actor).await?;
    clone.licence_holder_id = version.licence_holder_id;
    tx.insert_version(&clone).await?;

    sites::discard_drafts(tx, &old).await?;
    sites::activate_selection(tx, &new, &clone.data, ctx.now).await?;
    reminders::reassign(tx, old.id, new.id, destination, &condition_keys(&clone.data), ctx.now).await?;

    tracing::info!(
        from_project = %old.id,
        to_project = %new.id,
        from_establishment = %old.establishment_id,
        to_establishment = %destination,
        "project transferred"
    );
    Ok(new)
}

/// Move an unlicensed draft to another establishment the licence holder
/// belongs to.
pub async fn transfer_draft<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    destination: EstablishmentId,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    project.status.require(ProjectStatus::Inactive, "transfer draft")?;
    let holder = project
        .licence_holder_id
        .ok_or(ValidationError::MissingField("licenceHolderId"))?;

    let mut filter = Map::new();
    filter.insert("profileId".into(), Value::String(holder.to_string()));
    filter.insert("establishmentId".into(), Value::String(destination.to_string()));
    if tx.find_records("permission", &filter).await?.is_empty() {
        return Err(ResolverError::NotAssociated {
            profile: holder.to_string(),
            establishment: destination.to_string(),
        });
    }

    project.establishment_id = destination;
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    Ok(project)
}
