//! # Stored Records
//!
//! Typed rows for every table the engine writes. Serialization is
//! camelCase so a record rendered into a changelog `state` matches the
//! field names of inbound change requests.
//!
//! Soft deletion is a nullable `deleted` timestamp. The default accessors on
//! [`Transaction`](crate::Transaction) never return a deleted row; the
//! `*_including_deleted` accessors do.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::{EstablishmentId, ProfileId, ProjectId, VersionData, VersionId};
use asl_state::{AvailabilityStatus, ProjectStatus, RaStatus, ReminderStatus, VersionStatus};

// ─── Project ─────────────────────────────────────────────────────────

/// A licence application and, once granted, the licence itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub status: ProjectStatus,
    pub establishment_id: EstablishmentId,
    pub licence_holder_id: Option<ProfileId>,
    pub title: Option<String>,
    pub licence_number: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub amended_date: Option<DateTime<Utc>>,
    pub revocation_date: Option<DateTime<Utc>>,
    pub ra_date: Option<DateTime<Utc>>,
    pub ra_granted_date: Option<DateTime<Utc>>,
    pub species: Vec<String>,
    pub is_legacy_stub: bool,
    pub schema_version: i32,
    pub previous_establishment_id: Option<EstablishmentId>,
    pub previous_project_id: Option<ProjectId>,
    pub transfer_establishment_id: Option<EstablishmentId>,
    pub transfer_project_id: Option<ProjectId>,
    pub transferred_in_date: Option<DateTime<Utc>>,
    pub transferred_out_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

impl Project {
    /// A fresh `inactive` project with no licence fields set.
    pub fn new(establishment_id: EstablishmentId, now: DateTime<Utc>) -> Self {
        Self {
            id: ProjectId::new(),
            status: ProjectStatus::Inactive,
            establishment_id,
            licence_holder_id: None,
            title: None,
            licence_number: None,
            issue_date: None,
            expiry_date: None,
            amended_date: None,
            revocation_date: None,
            ra_date: None,
            ra_granted_date: None,
            species: Vec::new(),
            is_legacy_stub: false,
            schema_version: 1,
            previous_establishment_id: None,
            previous_project_id: None,
            transfer_establishment_id: None,
            transfer_project_id: None,
            transferred_in_date: None,
            transferred_out_date: None,
            created_at: now,
            updated_at: now,
            deleted: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

// ─── Project version ─────────────────────────────────────────────────

/// One snapshot of a project's structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub status: VersionStatus,
    pub data: VersionData,
    pub ra_compulsory: bool,
    pub asru_version: bool,
    pub licence_holder_id: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

impl ProjectVersion {
    /// A new `draft` version of `project_id`.
    pub fn draft(project_id: ProjectId, data: VersionData, now: DateTime<Utc>) -> Self {
        Self {
            id: VersionId::new(),
            project_id,
            status: VersionStatus::Draft,
            data,
            ra_compulsory: false,
            asru_version: false,
            licence_holder_id: None,
            created_at: now,
            updated_at: now,
            deleted: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

// ─── Additional availability ─────────────────────────────────────────

/// Permission for a project to operate at a non-primary establishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEstablishment {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub establishment_id: EstablishmentId,
    pub status: AvailabilityStatus,
    /// The granted version that removed this site.
    pub version_id: Option<VersionId>,
    pub issue_date: Option<DateTime<Utc>>,
    pub revoked_date: Option<DateTime<Utc>>,
}

impl ProjectEstablishment {
    pub fn new(project_id: ProjectId, establishment_id: EstablishmentId, status: AvailabilityStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            establishment_id,
            status,
            version_id: None,
            issue_date: None,
            revoked_date: None,
        }
    }
}

// ─── Retrospective assessment ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrospectiveAssessment {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub status: RaStatus,
    pub data: VersionData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

// ─── Reminders ───────────────────────────────────────────────────────

/// A deadline attached to a licence condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    /// `"project"` or `"establishment"`.
    pub model_type: String,
    pub model_id: Uuid,
    pub establishment_id: EstablishmentId,
    pub condition_key: String,
    pub deadline: NaiveDate,
    pub status: ReminderStatus,
    pub deleted: Option<DateTime<Utc>>,
}

/// A profile's acknowledgement of a reminder. Never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDismissal {
    pub id: Uuid,
    pub reminder_id: Uuid,
    pub profile_id: ProfileId,
    pub created_at: DateTime<Utc>,
}

// ─── Changelog ───────────────────────────────────────────────────────

/// One audit row per processed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: Uuid,
    pub message_id: String,
    pub establishment_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub model_type: String,
    /// The request action, or `"error"` for a failure record.
    pub action: String,
    pub changed_by: Option<Uuid>,
    pub state: Value,
    pub created_at: DateTime<Utc>,
}

impl ChangelogEntry {
    pub fn is_error(&self) -> bool {
        self.action == "error"
    }
}

// ─── Generic records ─────────────────────────────────────────────────

/// A simple record (establishment, profile, permission, …) stored as a
/// validated JSON object keyed by model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericRecord {
    pub id: Uuid,
    pub model: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

impl GenericRecord {
    /// Whether every `filter` key equals the record's value for it.
    pub fn matches(&self, filter: &Map<String, Value>) -> bool {
        filter.iter().all(|(k, v)| self.data.get(k) == Some(v))
    }

    /// A string field from the record's data.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// A boolean field from the record's data; absent counts as `false`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(Value::Bool(true)))
    }
}
