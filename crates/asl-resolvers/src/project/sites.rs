//! Additional-site availability rows.
//!
//! The primary establishment never gets a row; selections naming it are
//! ignored.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use asl_core::{EstablishmentId, VersionData, VersionId};
use asl_rules::{selected_establishments, AvailabilityPlan};
use asl_state::AvailabilityStatus;
use asl_store::{Project, ProjectEstablishment, Transaction};

use crate::error::ResolverError;

fn selection(data: &VersionData, primary: EstablishmentId) -> BTreeSet<Uuid> {
    let mut sites = selected_establishments(data);
    sites.remove(primary.as_uuid());
    sites
}

/// Record `draft` rows for sites a submitted version newly selects.
pub(crate) async fn record_drafts<T: Transaction>(
    tx: &mut T,
    project: &Project,
    data: &VersionData,
) -> Result<(), ResolverError> {
    let existing: BTreeSet<Uuid> = tx
        .project_establishments(project.id)
        .await?
        .into_iter()
        .map(|row| *row.establishment_id.as_uuid())
        .collect();

    for site in selection(data, project.establishment_id).difference(&existing) {
        let row = ProjectEstablishment::new(project.id, EstablishmentId::from_uuid(*site), AvailabilityStatus::Draft);
        tx.insert_project_establishment(&row).await?;
    }
    Ok(())
}

/// Apply the grant-time plan between the previous granted selection and the
/// one being granted.
pub(crate) async fn reconcile<T: Transaction>(
    tx: &mut T,
    project: &Project,
    previous: Option<&VersionData>,
    granted: &VersionData,
    version_id: VersionId,
    now: DateTime<Utc>,
) -> Result<AvailabilityPlan, ResolverError> {
    let before = previous
        .map(|d| selection(d, project.establishment_id))
        .unwrap_or_default();
    let plan = AvailabilityPlan::between(&before, &selection(granted, project.establishment_id));

    let rows = tx.project_establishments(project.id).await?;
    for mut row in rows.iter().cloned() {
        let site = *row.establishment_id.as_uuid();
        if plan.remove.contains(&site) && row.status != AvailabilityStatus::Removed {
            row.status = AvailabilityStatus::Removed;
            row.version_id = Some(version_id);
            row.revoked_date = Some(now);
            tx.update_project_establishment(&row).await?;
        } else if plan.activate.contains(&site) && row.status.needs_activation() {
            row.status = AvailabilityStatus::Active;
            row.version_id = None;
            row.issue_date = Some(now);
            row.revoked_date = None;
            tx.update_project_establishment(&row).await?;
        }
    }

    let known: BTreeSet<Uuid> = rows.iter().map(|r| *r.establishment_id.as_uuid()).collect();
    for site in plan.activate.difference(&known) {
        insert_active(tx, project, EstablishmentId::from_uuid(*site), now).await?;
    }

    tracing::debug!(
        project_id = %project.id,
        removed = plan.remove.len(),
        active = plan.activate.len(),
        "additional availability reconciled"
    );
    Ok(plan)
}

/// Physically remove `draft` rows; they carry no history.
pub(crate) async fn discard_drafts<T: Transaction>(tx: &mut T, project: &Project) -> Result<(), ResolverError> {
    for row in tx.project_establishments(project.id).await? {
        if row.status == AvailabilityStatus::Draft {
            tx.remove_project_establishment(row.id).await?;
        }
    }
    Ok(())
}

/// Create `active` rows for every site `data` selects.
pub(crate) async fn activate_selection<T: Transaction>(
    tx: &mut T,
    project: &Project,
    data: &VersionData,
    now: DateTime<Utc>,
) -> Result<(), ResolverError> {
    for site in selection(data, project.establishment_id) {
        insert_active(tx, project, EstablishmentId::from_uuid(site), now).await?;
    }
    Ok(())
}

async fn insert_active<T: Transaction>(
    tx: &mut T,
    project: &Project,
    site: EstablishmentId,
    now: DateTime<Utc>,
) -> Result<(), ResolverError> {
    let mut row = ProjectEstablishment::new(project.id, site, AvailabilityStatus::Active);
    row.issue_date = Some(now);
    tx.insert_project_establishment(&row).await?;
    Ok(())
}
