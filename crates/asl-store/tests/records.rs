//! Record serialization and store contract checks against the in-memory store.

use asl_core::{EstablishmentId, ProfileId, VersionData};
use asl_state::{ReminderStatus, VersionStatus};
use asl_store::{MemoryStore, Project, ProjectVersion, Reminder, ReminderDismissal, Store, Transaction};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

#[test]
fn project_serializes_camel_case() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let project = Project::new(EstablishmentId::new(), now);
    let value = serde_json::to_value(&project).unwrap();
    assert_eq!(value["status"], json!("inactive"));
    assert!(value.get("licenceNumber").is_some());
    assert!(value.get("isLegacyStub").is_some());
    assert!(value.get("licence_number").is_none());
}

#[test]
fn version_data_serializes_as_plain_object() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let project = Project::new(EstablishmentId::new(), now);
    let version = ProjectVersion::draft(project.id, VersionData::from(json!({"title": "T"})), now);
    let value = serde_json::to_value(&version).unwrap();
    assert_eq!(value["data"], json!({"title": "T"}));
    assert_eq!(value["status"], json!("draft"));
}

#[tokio::test]
async fn soft_deleted_versions_visible_only_when_including_deleted() {
    let store = MemoryStore::new();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let project = Project::new(EstablishmentId::new(), now);
    let mut version = ProjectVersion::draft(project.id, VersionData::new(), now);
    version.status = VersionStatus::Submitted;

    let mut tx = store.begin().await.unwrap();
    tx.insert_project(&project).await.unwrap();
    tx.insert_version(&version).await.unwrap();
    version.deleted = Some(now);
    tx.update_version(&version).await.unwrap();

    assert!(tx.project_versions(project.id).await.unwrap().is_empty());
    assert_eq!(tx.project_versions_including_deleted(project.id).await.unwrap().len(), 1);
    assert!(tx.get_version(version.id).await.unwrap().is_none());
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn dismissals_are_listed_per_reminder() {
    let store = MemoryStore::new();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let reminder = Reminder {
        id: Uuid::new_v4(),
        model_type: "project".into(),
        model_id: Uuid::new_v4(),
        establishment_id: EstablishmentId::new(),
        condition_key: "poles".into(),
        deadline: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        status: ReminderStatus::Active,
        deleted: None,
    };
    let dismissal = ReminderDismissal {
        id: Uuid::new_v4(),
        reminder_id: reminder.id,
        profile_id: ProfileId::new(),
        created_at: now,
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_reminder(&reminder).await.unwrap();
    tx.insert_dismissal(&dismissal).await.unwrap();
    assert_eq!(tx.dismissals_for(reminder.id).await.unwrap(), vec![dismissal]);
    assert!(tx.dismissals_for(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_of_missing_row_fails() {
    let store = MemoryStore::new();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let project = Project::new(EstablishmentId::new(), now);
    let mut tx = store.begin().await.unwrap();
    assert!(tx.update_project(&project).await.is_err());
}
