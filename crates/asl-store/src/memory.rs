//! # In-Memory Store
//!
//! Every table lives in one [`Tables`] value behind a `tokio::sync::Mutex`.
//! A transaction takes the lock for its whole lifetime and mutates a copy,
//! so transactions are serialised and a dropped or rolled-back transaction
//! leaves no trace.
//!
//! Uniqueness rules match the PostgreSQL indexes: one licence number per
//! project and one site row per (project, establishment).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use asl_core::{ProjectId, VersionId};
use asl_state::ProjectStatus;

use crate::error::StoreError;
use crate::records::{
    ChangelogEntry, GenericRecord, Project, ProjectEstablishment, ProjectVersion, Reminder,
    ReminderDismissal, RetrospectiveAssessment,
};
use crate::{Store, Transaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    /// Insertion order is the tie-break for equal `created_at`.
    versions: Vec<ProjectVersion>,
    establishments: Vec<ProjectEstablishment>,
    ras: Vec<RetrospectiveAssessment>,
    reminders: Vec<Reminder>,
    dismissals: Vec<ReminderDismissal>,
    changelog: Vec<ChangelogEntry>,
    records: HashMap<Uuid, GenericRecord>,
}

/// Process-local store for tests and single-node runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed changelog rows, oldest first.
    pub async fn changelog(&self) -> Vec<ChangelogEntry> {
        self.tables.lock().await.changelog.clone()
    }
}

impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTransaction { guard, work })
    }
}

/// A transaction over [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

/// Replace the row `same` selects, or fail as missing.
fn replace<T: Clone>(
    rows: &mut [T],
    row: &T,
    same: impl Fn(&T) -> bool,
    kind: &'static str,
    id: impl ToString,
) -> Result<(), StoreError> {
    match rows.iter_mut().find(|r| same(r)) {
        Some(slot) => {
            *slot = row.clone();
            Ok(())
        }
        None => Err(StoreError::Missing {
            kind,
            id: id.to_string(),
        }),
    }
}

fn sorted_by_creation<T: Clone>(rows: impl Iterator<Item = T>, created: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.collect();
    // Stable sort keeps insertion order on ties.
    out.sort_by_key(|r| created(r));
    out
}

impl MemoryTransaction {
    /// Mirrors the partial unique index: transferred projects keep their
    /// number without holding it.
    fn licence_number_taken(&self, project: &Project) -> bool {
        if project.status == ProjectStatus::Transferred {
            return false;
        }
        let Some(number) = project.licence_number.as_deref() else {
            return false;
        };
        self.work.projects.values().any(|p| {
            p.id != project.id
                && p.status != ProjectStatus::Transferred
                && p.licence_number.as_deref() == Some(number)
        })
    }
}

impl Transaction for MemoryTransaction {
    async fn commit(self) -> Result<(), StoreError> {
        let Self { mut guard, work } = self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }

    // ─── Projects ────────────────────────────────────────────────────

    async fn get_project(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.work.projects.get(&id).filter(|p| !p.is_deleted()).cloned())
    }

    async fn get_project_including_deleted(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.work.projects.get(&id).cloned())
    }

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError> {
        if self.work.projects.contains_key(&project.id) {
            return Err(StoreError::Conflict(format!("project {} already exists", project.id)));
        }
        if self.licence_number_taken(project) {
            return Err(StoreError::Conflict(format!(
                "licence number {} already in use",
                project.licence_number.as_deref().unwrap_or_default()
            )));
        }
        self.work.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn update_project(&mut self, project: &Project) -> Result<(), StoreError> {
        if !self.work.projects.contains_key(&project.id) {
            return Err(StoreError::Missing {
                kind: "project",
                id: project.id.to_string(),
            });
        }
        if self.licence_number_taken(project) {
            return Err(StoreError::Conflict(format!(
                "licence number {} already in use",
                project.licence_number.as_deref().unwrap_or_default()
            )));
        }
        self.work.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn active_projects_expiring_before(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<Project>, StoreError> {
        Ok(self
            .work
            .projects
            .values()
            .filter(|p| !p.is_deleted() && p.status == ProjectStatus::Active)
            .filter(|p| p.expiry_date.is_some_and(|e| e < cutoff))
            .cloned()
            .collect())
    }

    async fn licence_number_in_use(&mut self, licence_number: &str) -> Result<bool, StoreError> {
        let in_projects = self
            .work
            .projects
            .values()
            .any(|p| p.licence_number.as_deref() == Some(licence_number));
        let in_records = self
            .work
            .records
            .values()
            .any(|r| r.str("licenceNumber") == Some(licence_number));
        Ok(in_projects || in_records)
    }

    // ─── Versions ────────────────────────────────────────────────────

    async fn get_version(&mut self, id: VersionId) -> Result<Option<ProjectVersion>, StoreError> {
        Ok(self
            .work
            .versions
            .iter()
            .find(|v| v.id == id && !v.is_deleted())
            .cloned())
    }

    async fn insert_version(&mut self, version: &ProjectVersion) -> Result<(), StoreError> {
        if self.work.versions.iter().any(|v| v.id == version.id) {
            return Err(StoreError::Conflict(format!("version {} already exists", version.id)));
        }
        self.work.versions.push(version.clone());
        Ok(())
    }

    async fn update_version(&mut self, version: &ProjectVersion) -> Result<(), StoreError> {
        replace(&mut self.work.versions, version, |v| v.id == version.id, "version", version.id)
    }

    async fn project_versions(&mut self, project_id: ProjectId) -> Result<Vec<ProjectVersion>, StoreError> {
        Ok(sorted_by_creation(
            self.work
                .versions
                .iter()
                .filter(|v| v.project_id == project_id && !v.is_deleted())
                .cloned(),
            |v| v.created_at,
        ))
    }

    async fn project_versions_including_deleted(
        &mut self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectVersion>, StoreError> {
        Ok(sorted_by_creation(
            self.work.versions.iter().filter(|v| v.project_id == project_id).cloned(),
            |v| v.created_at,
        ))
    }

    // ─── Additional availability ─────────────────────────────────────

    async fn project_establishments(&mut self, project_id: ProjectId) -> Result<Vec<ProjectEstablishment>, StoreError> {
        Ok(self
            .work
            .establishments
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn insert_project_establishment(&mut self, row: &ProjectEstablishment) -> Result<(), StoreError> {
        let duplicate = self
            .work
            .establishments
            .iter()
            .any(|r| r.project_id == row.project_id && r.establishment_id == row.establishment_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "project {} already has a row for establishment {}",
                row.project_id, row.establishment_id
            )));
        }
        self.work.establishments.push(row.clone());
        Ok(())
    }

    async fn update_project_establishment(&mut self, row: &ProjectEstablishment) -> Result<(), StoreError> {
        replace(
            &mut self.work.establishments,
            row,
            |r| r.id == row.id,
            "project establishment",
            row.id,
        )
    }

    async fn remove_project_establishment(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.work.establishments.retain(|r| r.id != id);
        Ok(())
    }

    // ─── Retrospective assessments ───────────────────────────────────

    async fn get_ra(&mut self, id: Uuid) -> Result<Option<RetrospectiveAssessment>, StoreError> {
        Ok(self
            .work
            .ras
            .iter()
            .find(|r| r.id == id && r.deleted.is_none())
            .cloned())
    }

    async fn insert_ra(&mut self, ra: &RetrospectiveAssessment) -> Result<(), StoreError> {
        self.work.ras.push(ra.clone());
        Ok(())
    }

    async fn update_ra(&mut self, ra: &RetrospectiveAssessment) -> Result<(), StoreError> {
        replace(&mut self.work.ras, ra, |r| r.id == ra.id, "retrospective assessment", ra.id)
    }

    async fn project_ras(&mut self, project_id: ProjectId) -> Result<Vec<RetrospectiveAssessment>, StoreError> {
        Ok(sorted_by_creation(
            self.work
                .ras
                .iter()
                .filter(|r| r.project_id == project_id && r.deleted.is_none())
                .cloned(),
            |r| r.created_at,
        ))
    }

    // ─── Reminders ───────────────────────────────────────────────────

    async fn get_reminder(&mut self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        Ok(self
            .work
            .reminders
            .iter()
            .find(|r| r.id == id && r.deleted.is_none())
            .cloned())
    }

    async fn get_reminder_including_deleted(&mut self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        Ok(self.work.reminders.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_reminder(&mut self, reminder: &Reminder) -> Result<(), StoreError> {
        if self.work.reminders.iter().any(|r| r.id == reminder.id) {
            return Err(StoreError::Conflict(format!("reminder {} already exists", reminder.id)));
        }
        self.work.reminders.push(reminder.clone());
        Ok(())
    }

    async fn update_reminder(&mut self, reminder: &Reminder) -> Result<(), StoreError> {
        replace(&mut self.work.reminders, reminder, |r| r.id == reminder.id, "reminder", reminder.id)
    }

    async fn reminders_for(&mut self, model_id: Uuid) -> Result<Vec<Reminder>, StoreError> {
        Ok(self
            .work
            .reminders
            .iter()
            .filter(|r| r.model_id == model_id && r.deleted.is_none())
            .cloned()
            .collect())
    }

    async fn insert_dismissal(&mut self, dismissal: &ReminderDismissal) -> Result<(), StoreError> {
        self.work.dismissals.push(dismissal.clone());
        Ok(())
    }

    async fn dismissals_for(&mut self, reminder_id: Uuid) -> Result<Vec<ReminderDismissal>, StoreError> {
        Ok(self
            .work
            .dismissals
            .iter()
            .filter(|d| d.reminder_id == reminder_id)
            .cloned()
            .collect())
    }

    // ─── Changelog ───────────────────────────────────────────────────

    async fn insert_changelog(&mut self, entry: &ChangelogEntry) -> Result<(), StoreError> {
        self.work.changelog.push(entry.clone());
        Ok(())
    }

    // ─── Generic records ─────────────────────────────────────────────

    async fn get_record(&mut self, model: &str, id: Uuid) -> Result<Option<GenericRecord>, StoreError> {
        Ok(self
            .work
            .records
            .get(&id)
            .filter(|r| r.model == model && r.deleted.is_none())
            .cloned())
    }

    async fn get_record_including_deleted(&mut self, model: &str, id: Uuid) -> Result<Option<GenericRecord>, StoreError> {
        Ok(self.work.records.get(&id).filter(|r| r.model == model).cloned())
    }

    async fn insert_record(&mut self, record: &GenericRecord) -> Result<(), StoreError> {
        if self.work.records.contains_key(&record.id) {
            return Err(StoreError::Conflict(format!("{} {} already exists", record.model, record.id)));
        }
        self.work.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_record(&mut self, record: &GenericRecord) -> Result<(), StoreError> {
        match self.work.records.get_mut(&record.id) {
            Some(slot) if slot.model == record.model => {
                *slot = record.clone();
                Ok(())
            }
            _ => Err(StoreError::Missing {
                kind: "record",
                id: record.id.to_string(),
            }),
        }
    }

    async fn find_records(&mut self, model: &str, filter: &Map<String, Value>) -> Result<Vec<GenericRecord>, StoreError> {
        let mut out: Vec<GenericRecord> = self
            .work
            .records
            .values()
            .filter(|r| r.model == model && r.deleted.is_none() && r.matches(filter))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::{EstablishmentId, VersionData};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let project = Project::new(EstablishmentId::new(), at(0));

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_project(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let store = MemoryStore::new();
        let project = Project::new(EstablishmentId::new(), at(0));

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_project(project.id).await.unwrap(), Some(project));
    }

    #[tokio::test]
    async fn test_soft_deleted_project_hidden_from_default_view() {
        let store = MemoryStore::new();
        let mut project = Project::new(EstablishmentId::new(), at(0));
        project.deleted = Some(at(1));

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project).await.unwrap();
        assert!(tx.get_project(project.id).await.unwrap().is_none());
        assert!(tx.get_project_including_deleted(project.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_versions_ordered_by_creation_with_stable_ties() {
        let store = MemoryStore::new();
        let project = Project::new(EstablishmentId::new(), at(0));
        let late = ProjectVersion::draft(project.id, VersionData::new(), at(10));
        let early = ProjectVersion::draft(project.id, VersionData::new(), at(5));
        let tie = ProjectVersion::draft(project.id, VersionData::new(), at(10));

        let mut tx = store.begin().await.unwrap();
        tx.insert_version(&late).await.unwrap();
        tx.insert_version(&early).await.unwrap();
        tx.insert_version(&tie).await.unwrap();
        let ids: Vec<_> = tx
            .project_versions(project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id, tie.id]);
    }

    #[tokio::test]
    async fn test_duplicate_licence_number_rejected() {
        let store = MemoryStore::new();
        let mut a = Project::new(EstablishmentId::new(), at(0));
        a.licence_number = Some("PP1234".to_string());
        let mut b = Project::new(EstablishmentId::new(), at(0));
        b.licence_number = Some("PP1234".to_string());

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&a).await.unwrap();
        assert!(matches!(tx.insert_project(&b).await, Err(StoreError::Conflict(_))));
        assert!(tx.licence_number_in_use("PP1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_site_rows_unique_per_project_and_establishment() {
        let store = MemoryStore::new();
        let project = Project::new(EstablishmentId::new(), at(0));
        let site = EstablishmentId::new();
        let row = ProjectEstablishment::new(project.id, site, asl_state::AvailabilityStatus::Draft);
        let dup = ProjectEstablishment::new(project.id, site, asl_state::AvailabilityStatus::Active);

        let mut tx = store.begin().await.unwrap();
        tx.insert_project_establishment(&row).await.unwrap();
        assert!(matches!(
            tx.insert_project_establishment(&dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_find_records_matches_all_filter_pairs() {
        let store = MemoryStore::new();
        let profile = Uuid::new_v4();
        let est = Uuid::new_v4();
        let mut data = Map::new();
        data.insert("profileId".into(), Value::String(profile.to_string()));
        data.insert("establishmentId".into(), Value::String(est.to_string()));
        let record = GenericRecord {
            id: Uuid::new_v4(),
            model: "permission".into(),
            data: data.clone(),
            created_at: at(0),
            updated_at: at(0),
            deleted: None,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        assert_eq!(tx.find_records("permission", &data).await.unwrap().len(), 1);

        let mut other = data.clone();
        other.insert("establishmentId".into(), Value::String(Uuid::new_v4().to_string()));
        assert!(tx.find_records("permission", &other).await.unwrap().is_empty());
        assert!(tx.find_records("profile", &data).await.unwrap().is_empty());
    }
}
