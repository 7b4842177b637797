//! Retrospective assessment sub-lifecycle.
//!
//! Requests address the project; each action works on the project's most
//! recently created assessment.

use uuid::Uuid;

use asl_core::{ProjectId, VersionData};
use asl_state::{LifecycleError, RaStatus};
use asl_store::{Project, RetrospectiveAssessment, Transaction};

use crate::error::ResolverError;
use crate::project::{is_asru, load};
use crate::request::{Context, Resolution};

fn resolution(project: &Project, ra: Option<&RetrospectiveAssessment>) -> Result<Resolution, ResolverError> {
    Ok(Resolution::new(
        project.id,
        Some(*project.establishment_id.as_uuid()),
        serde_json::to_value(ra)?,
    ))
}

async fn latest<T: Transaction>(tx: &mut T, id: ProjectId) -> Result<RetrospectiveAssessment, ResolverError> {
    tx.project_ras(id)
        .await?
        .pop()
        .ok_or_else(|| ResolverError::not_found("retrospective assessment of project", id))
}

/// Start a new draft, copying the latest assessment's data unless `data`
/// is supplied.
pub async fn fork<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
    data: Option<VersionData>,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let project = load(tx, id).await?;
    let data = match data {
        Some(data) => data,
        None => tx
            .project_ras(id)
            .await?
            .pop()
            .map(|ra| ra.data)
            .unwrap_or_default(),
    };
    let ra = RetrospectiveAssessment {
        id: Uuid::new_v4(),
        project_id: id,
        status: RaStatus::Draft,
        data,
        created_at: ctx.now,
        updated_at: ctx.now,
        deleted: None,
    };
    tx.insert_ra(&ra).await?;
    resolution(&project, Some(&ra))
}

pub async fn submit<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Resolution, ResolverError> {
    let project = load(tx, id).await?;
    let mut ra = latest(tx, id).await?;
    ra.status = ra.status.submit()?;
    ra.updated_at = ctx.now;
    tx.update_ra(&ra).await?;
    resolution(&project, Some(&ra))
}

/// Grant the latest assessment. A regulator may grant one that was never
/// submitted.
pub async fn grant<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Resolution, ResolverError> {
    let mut project = load(tx, id).await?;
    let mut ra = latest(tx, id).await?;
    let regulator = is_asru(tx, ctx.actor).await?;
    ra.status = ra.status.grant(regulator)?;
    ra.updated_at = ctx.now;
    tx.update_ra(&ra).await?;

    project.ra_granted_date = Some(ctx.now);
    project.updated_at = ctx.now;
    tx.update_project(&project).await?;
    tracing::info!(project_id = %id, regulator, "retrospective assessment granted");
    resolution(&project, Some(&ra))
}

/// Soft-delete the latest assessment unless it is granted.
pub async fn delete<T: Transaction>(tx: &mut T, id: ProjectId, ctx: &Context) -> Result<Resolution, ResolverError> {
    let project = load(tx, id).await?;
    let mut ra = latest(tx, id).await?;
    if ra.status == RaStatus::Granted {
        return Err(LifecycleError::WrongState {
            record: "retrospective assessment",
            action: "delete",
            state: ra.status.to_string(),
        }
        .into());
    }
    ra.deleted = Some(ctx.now);
    ra.updated_at = ctx.now;
    tx.update_ra(&ra).await?;
    resolution(&project, None)
}
