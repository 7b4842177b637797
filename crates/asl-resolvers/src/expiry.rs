//! Expiry sweep.
//!
//! Runs outside the message path, from the worker's `expire` subcommand.

use chrono::{DateTime, Utc};

use asl_core::temporal::start_of_day;
use asl_core::ProjectId;
use asl_state::ProjectStatus;
use asl_store::Transaction;

use crate::error::ResolverError;

/// Mark every `active` project whose expiry fell before today's UTC
/// midnight as `expired`. Returns the ids touched.
pub async fn expire<T: Transaction>(tx: &mut T, now: DateTime<Utc>) -> Result<Vec<ProjectId>, ResolverError> {
    let cutoff = start_of_day(now);
    let mut expired = Vec::new();
    for mut project in tx.active_projects_expiring_before(cutoff).await? {
        project.status = project.status.transition(ProjectStatus::Expired)?;
        project.updated_at = now;
        tx.update_project(&project).await?;
        expired.push(project.id);
    }
    tracing::info!(count = expired.len(), %cutoff, "expiry sweep complete");
    Ok(expired)
}
