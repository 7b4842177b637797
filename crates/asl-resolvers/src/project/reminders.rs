//! Condition reminder reconciliation for project operations.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use asl_core::{EstablishmentId, ProjectId, VersionData};
use asl_rules::{condition_keys, ReminderFate};
use asl_state::ReminderStatus;
use asl_store::Transaction;

use crate::error::ResolverError;

/// Counts of what a reconciliation did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderChanges {
    pub deleted: usize,
    pub activated: usize,
}

/// Delete reminders whose condition left the granted data; arm pending
/// reminders whose condition was granted.
pub(crate) async fn reconcile_on_grant<T: Transaction>(
    tx: &mut T,
    project_id: ProjectId,
    granted: &VersionData,
    now: DateTime<Utc>,
) -> Result<ReminderChanges, ResolverError> {
    let keys = condition_keys(granted);
    let mut changes = ReminderChanges::default();

    for mut reminder in tx.reminders_for(*project_id.as_uuid()).await? {
        let pending = reminder.status == ReminderStatus::Pending;
        match ReminderFate::decide(&reminder.condition_key, pending, &keys) {
            ReminderFate::Keep => continue,
            ReminderFate::Delete => {
                reminder.deleted = Some(now);
                changes.deleted += 1;
            }
            ReminderFate::Activate => {
                reminder.status = ReminderStatus::Active;
                changes.activated += 1;
            }
        }
        tx.update_reminder(&reminder).await?;
    }
    Ok(changes)
}

/// Move a transferred project's reminders to its successor, dropping those
/// whose condition is not in `keys`.
pub(crate) async fn reassign<T: Transaction>(
    tx: &mut T,
    from: ProjectId,
    to: ProjectId,
    establishment_id: EstablishmentId,
    keys: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Result<(), ResolverError> {
    for mut reminder in tx.reminders_for(*from.as_uuid()).await? {
        if !keys.contains(&reminder.condition_key) {
            reminder.deleted = Some(now);
        }
        reminder.model_id = *to.as_uuid();
        reminder.establishment_id = establishment_id;
        tx.update_reminder(&reminder).await?;
    }
    Ok(())
}

/// Soft-delete every `pending` reminder of a project.
pub(crate) async fn delete_pending<T: Transaction>(
    tx: &mut T,
    project_id: ProjectId,
    now: DateTime<Utc>,
) -> Result<usize, ResolverError> {
    let mut deleted = 0;
    for mut reminder in tx.reminders_for(*project_id.as_uuid()).await? {
        if reminder.status == ReminderStatus::Pending {
            reminder.deleted = Some(now);
            tx.update_reminder(&reminder).await?;
            deleted += 1;
        }
    }
    Ok(deleted)
}
