//! # asl-store — Transactional Record Store
//!
//! The resolvers see storage only through [`Transaction`]: every read and
//! write for one change request happens inside a single transaction, which
//! the message processor commits or rolls back as a whole.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: all tables behind one `tokio::sync::Mutex`. A
//!   transaction holds the lock and works on a copy; commit swaps the copy
//!   in. Used by tests and local runs.
//! - [`PgStore`]: PostgreSQL via `sqlx`, with embedded migrations. Rows that
//!   take part in read-modify-write reconciliation are read `FOR UPDATE`.
//!
//! ## Soft deletion
//!
//! Default accessors filter out rows whose `deleted` timestamp is set. The
//! `*_including_deleted` accessors do not. Nothing is ever physically
//! deleted except `draft` additional-availability rows, which carry no
//! history.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use asl_core::{ProjectId, VersionId};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use records::{
    ChangelogEntry, GenericRecord, Project, ProjectEstablishment, ProjectVersion, Reminder,
    ReminderDismissal, RetrospectiveAssessment,
};

/// Opens transactions.
pub trait Store: Send + Sync {
    /// The transaction type this store hands out.
    type Tx: Transaction;

    /// Begin a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;
}

/// One unit of work against the record tables.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// discards its writes.
pub trait Transaction: Send {
    /// Make every write in this transaction durable.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard every write in this transaction.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Projects
    // ═══════════════════════════════════════════════════════════════════

    /// A non-deleted project.
    fn get_project(&mut self, id: ProjectId) -> impl Future<Output = Result<Option<Project>, StoreError>> + Send;

    /// A project whether or not it is deleted.
    fn get_project_including_deleted(
        &mut self,
        id: ProjectId,
    ) -> impl Future<Output = Result<Option<Project>, StoreError>> + Send;

    fn insert_project(&mut self, project: &Project) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite a project row. Fails with [`StoreError::Missing`] if absent.
    fn update_project(&mut self, project: &Project) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Non-deleted `active` projects whose expiry is strictly before `cutoff`.
    fn active_projects_expiring_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Project>, StoreError>> + Send;

    /// Whether any project or generic record, deleted or not, holds
    /// `licence_number`.
    fn licence_number_in_use(&mut self, licence_number: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Versions
    // ═══════════════════════════════════════════════════════════════════

    /// A non-deleted version.
    fn get_version(&mut self, id: VersionId) -> impl Future<Output = Result<Option<ProjectVersion>, StoreError>> + Send;

    fn insert_version(&mut self, version: &ProjectVersion) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_version(&mut self, version: &ProjectVersion) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Non-deleted versions of a project, oldest first. Ties on
    /// `created_at` keep insertion order.
    fn project_versions(
        &mut self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<ProjectVersion>, StoreError>> + Send;

    /// Every version of a project, oldest first.
    fn project_versions_including_deleted(
        &mut self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<ProjectVersion>, StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Additional availability
    // ═══════════════════════════════════════════════════════════════════

    /// Every site row of a project, locked for update where supported.
    fn project_establishments(
        &mut self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<ProjectEstablishment>, StoreError>> + Send;

    /// Insert a site row. Fails with [`StoreError::Conflict`] if the
    /// (project, establishment) pair already exists.
    fn insert_project_establishment(
        &mut self,
        row: &ProjectEstablishment,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_project_establishment(
        &mut self,
        row: &ProjectEstablishment,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove_project_establishment(&mut self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Retrospective assessments
    // ═══════════════════════════════════════════════════════════════════

    fn get_ra(&mut self, id: Uuid) -> impl Future<Output = Result<Option<RetrospectiveAssessment>, StoreError>> + Send;

    fn insert_ra(&mut self, ra: &RetrospectiveAssessment) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_ra(&mut self, ra: &RetrospectiveAssessment) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Non-deleted assessments of a project, oldest first.
    fn project_ras(
        &mut self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<RetrospectiveAssessment>, StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Reminders
    // ═══════════════════════════════════════════════════════════════════

    fn get_reminder(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Reminder>, StoreError>> + Send;

    fn get_reminder_including_deleted(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Reminder>, StoreError>> + Send;

    fn insert_reminder(&mut self, reminder: &Reminder) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_reminder(&mut self, reminder: &Reminder) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Non-deleted reminders attached to `model_id`.
    fn reminders_for(&mut self, model_id: Uuid) -> impl Future<Output = Result<Vec<Reminder>, StoreError>> + Send;

    fn insert_dismissal(&mut self, dismissal: &ReminderDismissal) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn dismissals_for(
        &mut self,
        reminder_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ReminderDismissal>, StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Changelog
    // ═══════════════════════════════════════════════════════════════════

    fn insert_changelog(&mut self, entry: &ChangelogEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ═══════════════════════════════════════════════════════════════════
    // Generic records
    // ═══════════════════════════════════════════════════════════════════

    fn get_record(
        &mut self,
        model: &str,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<GenericRecord>, StoreError>> + Send;

    fn get_record_including_deleted(
        &mut self,
        model: &str,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<GenericRecord>, StoreError>> + Send;

    fn insert_record(&mut self, record: &GenericRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_record(&mut self, record: &GenericRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Non-deleted records of `model` whose data contains every key/value
    /// pair in `filter`.
    fn find_records(
        &mut self,
        model: &str,
        filter: &Map<String, Value>,
    ) -> impl Future<Output = Result<Vec<GenericRecord>, StoreError>> + Send;
}
