//! Drafting and amendment: fork, submit, update, corrections, and deletion.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use asl_core::{ProfileId, ProjectId};
use asl_rules::{expiry_date, extract_species, ra_date, ra_required};
use asl_state::{LifecycleError, ProjectStatus, VersionStatus};
use asl_store::{Project, ProjectVersion, Transaction};

use crate::error::ResolverError;
use crate::project::{invalid, is_asru, latest_granted, latest_version, load, reminders, resolution, sites};
use crate::request::{Context, Resolution};

/// Project fields `update` may change.
const UPDATABLE: &[&str] = &["title", "licenceHolderId"];

/// Prefix of the legacy experience field group kept in version data.
const EXPERIENCE_PREFIX: &str = "experience-";

fn wrong_version_state(action: &'static str, status: VersionStatus) -> ResolverError {
    LifecycleError::WrongState {
        record: "version",
        action,
        state: status.to_string(),
    }
    .into()
}

// ─── Fork / submit ───────────────────────────────────────────────────

/// Append a copy of the latest version.
pub async fn fork<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    preserve_status: bool,
    ctx: &Context,
) -> Result<ProjectVersion, ResolverError> {
    load(tx, id).await?;
    let source = latest_version(tx, id).await?;

    let mut version = ProjectVersion::draft(id, source.data.clone(), ctx.now);
    version.ra_compulsory = source.ra_compulsory;
    version.licence_holder_id = source.licence_holder_id;
    version.asru_version = if source.status == VersionStatus::Granted {
        is_asru(tx, ctx.actor).await?
    } else {
        source.asru_version
    };
    if preserve_status {
        version.status = source.status;
    }

    tx.insert_version(&version).await?;
    tracing::debug!(project_id = %id, version_id = %version.id, status = %version.status, "version forked");
    Ok(version)
}

/// Submit the latest draft.
pub async fn submit_draft<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    let mut version = latest_version(tx, id).await?;
    if !version.status.is_editable() {
        return Err(wrong_version_state("submit", version.status));
    }

    version.status = version.status.transition(VersionStatus::Submitted)?;
    version.asru_version = is_asru(tx, ctx.actor).await?;
    version.updated_at = ctx.now;
    tx.update_version(&version).await?;

    if project.status == ProjectStatus::Inactive {
        project.species = extract_species(&version.data, project.schema_version);
    }
    sites::record_drafts(tx, &project, &version.data).await?;

    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    Ok(project)
}

// ─── Update ──────────────────────────────────────────────────────────

fn experience_fields(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .filter(|(k, _)| k.starts_with(EXPERIENCE_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Apply allow-listed fields to the project; returns the new licence holder
/// if one was given.
fn patch_project(project: &mut Project, data: &Map<String, Value>) -> Result<Option<ProfileId>, ResolverError> {
    let mut holder = None;
    for key in UPDATABLE.iter().filter(|k| data.contains_key(**k)) {
        match (*key, &data[*key]) {
            ("title", Value::String(title)) => project.title = Some(title.clone()),
            ("title", Value::Null) => project.title = None,
            ("licenceHolderId", Value::String(raw)) => {
                let id = ProfileId::parse(raw)?;
                project.licence_holder_id = Some(id);
                holder = Some(id);
            }
            (key, value) => return Err(invalid(format!("{key} cannot be set to {value}"))),
        }
    }
    Ok(holder)
}

fn patch_version(version: &mut ProjectVersion, experience: &Map<String, Value>, holder: Option<ProfileId>, now: DateTime<Utc>) {
    version.data.merge(experience);
    if holder.is_some() {
        version.licence_holder_id = holder;
    }
    version.updated_at = now;
}

/// Update project fields and the legacy experience group.
///
/// Projects that are neither `active` nor `inactive` get their fields
/// patched and their versions left alone.
pub async fn update<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    data: &Map<String, Value>,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    let holder = patch_project(&mut project, data)?;
    let experience = experience_fields(data);

    match project.status {
        ProjectStatus::Active => {
            let mut version = fork(tx, id, true, ctx).await?;
            patch_version(&mut version, &experience, holder, ctx.now);
            tx.update_version(&version).await?;
            project.amended_date = Some(ctx.now);
        }
        ProjectStatus::Inactive => {
            let mut version = latest_version(tx, id).await?;
            patch_version(&mut version, &experience, holder, ctx.now);
            tx.update_version(&version).await?;
        }
        status => {
            tracing::debug!(project_id = %id, %status, "update leaves versions untouched");
        }
    }

    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    Ok(project)
}

// ─── Corrections ─────────────────────────────────────────────────────

/// Move the issue date of an active licence and re-derive its expiry.
pub async fn update_issue_date<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    issue_date: DateTime<Utc>,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    project.status.require(ProjectStatus::Active, "update issue date")?;
    let granted = latest_granted(tx, id)
        .await?
        .ok_or_else(|| ResolverError::not_found("granted version of project", id))?;

    let expiry = expiry_date(issue_date, granted.data.duration());
    project.issue_date = Some(issue_date);
    project.expiry_date = Some(expiry);
    project.ra_date = ra_date(expiry, ra_required(&granted.data));
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    Ok(project)
}

/// Correct the licence number recorded for a digitised paper licence.
pub async fn update_licence_number<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    licence_number: &str,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let mut project = load(tx, id).await?;
    if !project.is_legacy_stub {
        return Err(invalid("licence numbers can only be corrected on legacy stubs"));
    }
    if project.licence_number.as_deref() == Some(licence_number) {
        return Ok(project);
    }
    if tx.licence_number_in_use(licence_number).await? {
        return Err(invalid(format!("licence number {licence_number} is already in use")));
    }

    project.licence_number = Some(licence_number.to_string());
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    Ok(project)
}

// ─── Deletion ────────────────────────────────────────────────────────

/// Soft-delete a project with its versions and assessments.
pub async fn delete<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Resolution, ResolverError> {
    let project = load(tx, id).await?;
    if project.status == ProjectStatus::Active && !project.is_legacy_stub {
        return Err(LifecycleError::WrongState {
            record: "project",
            action: "delete",
            state: project.status.to_string(),
        }
        .into());
    }
    cascade_delete(tx, project, ctx.now).await
}

async fn cascade_delete<T: Transaction>(
    tx: &mut T,
    mut project: Project,
    now: DateTime<Utc>,
) -> Result<Resolution, ResolverError> {
    for mut version in tx.project_versions(project.id).await? {
        version.deleted = Some(now);
        tx.update_version(&version).await?;
    }
    for mut ra in tx.project_ras(project.id).await? {
        ra.deleted = Some(now);
        tx.update_ra(&ra).await?;
    }
    project.deleted = Some(now);
    project.updated_at = now;
    tx.update_project(&project).await?;
    tracing::info!(project_id = %project.id, "project deleted");

    let visible = tx.get_project(project.id).await?;
    Ok(Resolution::new(
        project.id,
        Some(*project.establishment_id.as_uuid()),
        serde_json::to_value(visible)?,
    ))
}

/// Discard everything drafted since the last grant.
pub async fn delete_amendments<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let project = load(tx, id).await?;
    let versions = tx.project_versions(id).await?;
    let Some(last_grant) = versions.iter().rposition(|v| v.status == VersionStatus::Granted) else {
        return cascade_delete(tx, project, ctx.now).await;
    };

    let discarded = versions.len() - last_grant - 1;
    for mut version in versions.into_iter().skip(last_grant + 1) {
        version.deleted = Some(ctx.now);
        tx.update_version(&version).await?;
    }
    let reminders = reminders::delete_pending(tx, id, ctx.now).await?;
    tracing::info!(project_id = %id, versions = discarded, reminders, "amendments deleted");

    resolution(&project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::{EstablishmentId, VersionData};
    use serde_json::json;

    #[test]
    fn experience_group_is_prefix_filtered() {
        let patch = json!({"experience-projects": true, "title": "ignored", "experience-others": "x"});
        let mut data = VersionData::new();
        data.merge(&experience_fields(patch.as_object().unwrap()));
        assert_eq!(data.get("experience-projects"), Some(&json!(true)));
        assert_eq!(data.get("experience-others"), Some(&json!("x")));
        assert!(data.get("title").is_none());
    }

    #[test]
    fn patch_project_rejects_non_string_title() {
        let mut project = Project::new(EstablishmentId::new(), Utc::now());
        let data = json!({"title": 5});
        assert!(patch_project(&mut project, data.as_object().unwrap()).is_err());
    }

    #[test]
    fn patch_project_ignores_other_fields() {
        let mut project = Project::new(EstablishmentId::new(), Utc::now());
        let data = json!({"title": "New", "status": "active"});
        assert_eq!(patch_project(&mut project, data.as_object().unwrap()).unwrap(), None);
        assert_eq!(project.title.as_deref(), Some("New"));
        assert_eq!(project.status, ProjectStatus::Inactive);
    }
}
