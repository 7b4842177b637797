//! # Grant, Convert, Revoke
//!
//! Granting a version is the only path that rewrites a project's public
//! licence fields. The steps run in a fixed order inside the caller's
//! transaction; a failure at any step (a reminder write, a licence number
//! probe) leaves nothing behind once the transaction rolls back.

use asl_core::ProjectId;
use asl_rules::{expiry_date, extract_species, ra_compulsory, ra_date, ra_required, strip_deleted};
use asl_state::{LifecycleError, ProjectStatus, VersionStatus};
use asl_store::{Project, Transaction};

use crate::error::ResolverError;
use crate::licence_number::{self, LicenceKind};
use crate::project::{invalid, latest_granted, latest_version, load, reminders, sites};
use crate::request::Context;

/// Grant the latest version of a project.
///
/// Granting an already granted version returns the project unchanged.
pub async fn grant<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    let mut versions = tx.project_versions(id).await?;
    let mut version = versions
        .pop()
        .ok_or_else(|| ResolverError::not_found("version of project", id))?;

    if version.status == VersionStatus::Granted {
        tracing::debug!(project_id = %id, version_id = %version.id, "version already granted");
        return Ok(project);
    }
    if version.status != VersionStatus::Submitted {
        return Err(LifecycleError::WrongState {
            record: "version",
            action: "grant",
            state: version.status.to_string(),
        }
        .into());
    }
    let status = project.status.transition(ProjectStatus::Active)?;
    let previous = versions.into_iter().rev().find(|v| v.status == VersionStatus::Granted);

    // (a) soft-deleted protocols and conditions do not survive a grant
    let data = strip_deleted(&version.data);

    // (b)
    sites::reconcile(tx, &project, previous.as_ref().map(|p| &p.data), &data, version.id, ctx.now).await?;

    // (c)
    version.status = version.status.transition(VersionStatus::Granted)?;
    version.ra_compulsory = ra_compulsory(&data);
    version.data = data;
    version.updated_at = ctx.now;
    tx.update_version(&version).await?;
    let data = &version.data;

    // (d)
    if project.licence_number.is_none() {
        let kind = LicenceKind::Project {
            schema_version: project.schema_version,
        };
        project.licence_number = Some(licence_number::generate(tx, kind).await?);
    }

    // (e) an unchanged duration keeps the existing expiry
    let issue_date = project.issue_date.unwrap_or(ctx.now);
    let duration_changed = match &previous {
        Some(prev) => prev.data.duration() != data.duration(),
        None => true,
    };
    let expiry = match project.expiry_date {
        Some(expiry) if !duration_changed && data.duration().is_some() => expiry,
        _ => expiry_date(issue_date, data.duration()),
    };

    // (f)
    project.species = extract_species(data, project.schema_version);

    // (g)
    if previous.is_some() {
        project.amended_date = Some(ctx.now);
    }

    // (h)
    project.ra_date = ra_date(expiry, ra_required(data));

    // (i)
    let changes = reminders::reconcile_on_grant(tx, id, data, ctx.now).await?;

    // (j)
    project.status = status;
    project.issue_date = Some(issue_date);
    project.expiry_date = Some(expiry);
    if let Some(title) = data.title() {
        project.title = Some(title.to_string());
    }
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;

    tracing::info!(
        project_id = %id,
        version_id = %version.id,
        licence_number = project.licence_number.as_deref().unwrap_or_default(),
        amendment = previous.is_some(),
        reminders_deleted = changes.deleted,
        reminders_activated = changes.activated,
        "project granted"
    );
    Ok(project)
}

/// Turn a digitised paper licence into a standard record.
pub async fn convert<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    let mut version = latest_version(tx, id).await?;
    if !project.is_legacy_stub || !version.data.is_legacy_stub() {
        return Err(invalid("only legacy stubs can be converted"));
    }
    if version.status != VersionStatus::Draft {
        return Err(LifecycleError::WrongState {
            record: "version",
            action: "convert",
            state: version.status.to_string(),
        }
        .into());
    }

    version.data.remove("isLegacyStub");
    version.status = version.status.transition(VersionStatus::Granted)?;
    version.ra_compulsory = ra_compulsory(&version.data);
    version.updated_at = ctx.now;
    tx.update_version(&version).await?;

    project.is_legacy_stub = false;
    project.schema_version = 1;
    let issue_date = project.issue_date.unwrap_or(ctx.now);
    let expiry = expiry_date(issue_date, version.data.duration());
    project.issue_date = Some(issue_date);
    project.expiry_date = Some(expiry);
    project.ra_date = ra_date(expiry, ra_required(&version.data));
    project.title = version.data.title().map(str::to_string).or(project.title.take());
    project.species = extract_species(&version.data, project.schema_version);
    project.status = if expiry > ctx.now {
        ProjectStatus::Active
    } else {
        ProjectStatus::Expired
    };
    if project.licence_number.is_none() {
        let kind = LicenceKind::Project {
            schema_version: project.schema_version,
        };
        project.licence_number = Some(licence_number::generate(tx, kind).await?);
    }
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;

    tracing::info!(project_id = %id, status = %project.status, "legacy stub converted");
    Ok(project)
}

/// Revoke an active licence.
pub async fn revoke<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    project.status.require(ProjectStatus::Active, "revoke")?;

    let required = latest_granted(tx, id)
        .await?
        .is_some_and(|v| ra_required(&v.data));

    project.status = project.status.transition(ProjectStatus::Revoked)?;
    project.revocation_date = Some(ctx.now);
    project.ra_date = ra_date(ctx.now, required);
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;

    tracing::info!(project_id = %id, ra_required = required, "project revoked");
    Ok(project)
}
