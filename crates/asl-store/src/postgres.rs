//! # PostgreSQL Store
//!
//! Runtime-checked `sqlx` queries over the tables in `migrations/`. Each
//! table has a private `*Row` type for `FromRow` mapping and an
//! `into_record` conversion that parses persisted status strings.
//!
//! Site rows are read `FOR UPDATE` because grant and transfer reconcile them
//! with a read-modify-write sequence.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Postgres;
use uuid::Uuid;

use asl_core::{ProjectId, VersionData, VersionId};

use crate::error::{classify, StoreError};
use crate::records::{
    ChangelogEntry, GenericRecord, Project, ProjectEstablishment, ProjectVersion, Reminder,
    ReminderDismissal, RetrospectiveAssessment,
};
use crate::{Store, Transaction};

/// A pooled PostgreSQL store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `url` and apply embedded migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are the caller's concern.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, shared with the table-backed queue.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgTransaction { tx })
    }
}

/// A transaction over [`PgStore`].
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

fn require_row(affected: u64, kind: &'static str, id: impl ToString) -> Result<(), StoreError> {
    if affected == 0 {
        Err(StoreError::Missing {
            kind,
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

const PROJECT_COLUMNS: &str = "id, status, establishment_id, licence_holder_id, title, licence_number, \
     issue_date, expiry_date, amended_date, revocation_date, ra_date, ra_granted_date, species, \
     is_legacy_stub, schema_version, previous_establishment_id, previous_project_id, \
     transfer_establishment_id, transfer_project_id, transferred_in_date, transferred_out_date, \
     created_at, updated_at, deleted";

const VERSION_COLUMNS: &str =
    "id, project_id, status, data, ra_compulsory, asru_version, licence_holder_id, created_at, updated_at, deleted";

const SITE_COLUMNS: &str = "id, project_id, establishment_id, status, version_id, issue_date, revoked_date";

const RA_COLUMNS: &str = "id, project_id, status, data, created_at, updated_at, deleted";

const REMINDER_COLUMNS: &str = "id, model_type, model_id, establishment_id, condition_key, deadline, status, deleted";

const RECORD_COLUMNS: &str = "id, model, data, created_at, updated_at, deleted";

impl PgTransaction {
    async fn fetch_project(&mut self, id: ProjectId, include_deleted: bool) -> Result<Option<Project>, StoreError> {
        let filter = if include_deleted { "" } else { " AND deleted IS NULL" };
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1{filter}");
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ProjectRow::into_record).transpose()
    }

    async fn fetch_versions(&mut self, project_id: ProjectId, include_deleted: bool) -> Result<Vec<ProjectVersion>, StoreError> {
        let filter = if include_deleted { "" } else { " AND deleted IS NULL" };
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM project_versions WHERE project_id = $1{filter} ORDER BY created_at, seq"
        );
        let rows = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(Uuid::from(project_id))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(VersionRow::into_record).collect()
    }

    async fn fetch_reminder(&mut self, id: Uuid, include_deleted: bool) -> Result<Option<Reminder>, StoreError> {
        let filter = if include_deleted { "" } else { " AND deleted IS NULL" };
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1{filter}");
        let row = sqlx::query_as::<_, ReminderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ReminderRow::into_record).transpose()
    }

    async fn fetch_record(&mut self, model: &str, id: Uuid, include_deleted: bool) -> Result<Option<GenericRecord>, StoreError> {
        let filter = if include_deleted { "" } else { " AND deleted IS NULL" };
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE model = $1 AND id = $2{filter}");
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(model)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(RecordRow::into_record))
    }
}

impl Transaction for PgTransaction {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }

    // ─── Projects ────────────────────────────────────────────────────

    async fn get_project(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.fetch_project(id, false).await
    }

    async fn get_project_including_deleted(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.fetch_project(id, true).await
    }

    async fn insert_project(&mut self, p: &Project) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO projects ({PROJECT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)"
        );
        sqlx::query(&sql)
            .bind(Uuid::from(p.id))
            .bind(p.status.as_str())
            .bind(Uuid::from(p.establishment_id))
            .bind(p.licence_holder_id.map(Uuid::from))
            .bind(&p.title)
            .bind(&p.licence_number)
            .bind(p.issue_date)
            .bind(p.expiry_date)
            .bind(p.amended_date)
            .bind(p.revocation_date)
            .bind(p.ra_date)
            .bind(p.ra_granted_date)
            .bind(&p.species)
            .bind(p.is_legacy_stub)
            .bind(p.schema_version)
            .bind(p.previous_establishment_id.map(Uuid::from))
            .bind(p.previous_project_id.map(Uuid::from))
            .bind(p.transfer_establishment_id.map(Uuid::from))
            .bind(p.transfer_project_id.map(Uuid::from))
            .bind(p.transferred_in_date)
            .bind(p.transferred_out_date)
            .bind(p.created_at)
            .bind(p.updated_at)
            .bind(p.deleted)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_project(&mut self, p: &Project) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE projects SET status = $2, establishment_id = $3, licence_holder_id = $4, title = $5,
             licence_number = $6, issue_date = $7, expiry_date = $8, amended_date = $9,
             revocation_date = $10, ra_date = $11, ra_granted_date = $12, species = $13,
             is_legacy_stub = $14, schema_version = $15, previous_establishment_id = $16,
             previous_project_id = $17, transfer_establishment_id = $18, transfer_project_id = $19,
             transferred_in_date = $20, transferred_out_date = $21, updated_at = $22, deleted = $23
             WHERE id = $1",
        )
        .bind(Uuid::from(p.id))
        .bind(p.status.as_str())
        .bind(Uuid::from(p.establishment_id))
        .bind(p.licence_holder_id.map(Uuid::from))
        .bind(&p.title)
        .bind(&p.licence_number)
        .bind(p.issue_date)
        .bind(p.expiry_date)
        .bind(p.amended_date)
        .bind(p.revocation_date)
        .bind(p.ra_date)
        .bind(p.ra_granted_date)
        .bind(&p.species)
        .bind(p.is_legacy_stub)
        .bind(p.schema_version)
        .bind(p.previous_establishment_id.map(Uuid::from))
        .bind(p.previous_project_id.map(Uuid::from))
        .bind(p.transfer_establishment_id.map(Uuid::from))
        .bind(p.transfer_project_id.map(Uuid::from))
        .bind(p.transferred_in_date)
        .bind(p.transferred_out_date)
        .bind(p.updated_at)
        .bind(p.deleted)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        require_row(result.rows_affected(), "project", p.id)
    }

    async fn active_projects_expiring_before(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<Project>, StoreError> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE status = 'active' AND deleted IS NULL AND expiry_date < $1
             ORDER BY expiry_date
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(cutoff)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(ProjectRow::into_record).collect()
    }

    async fn licence_number_in_use(&mut self, licence_number: &str) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE licence_number = $1)
                 OR EXISTS (SELECT 1 FROM records WHERE data->>'licenceNumber' = $1)",
        )
        .bind(licence_number)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    // ─── Versions ────────────────────────────────────────────────────

    async fn get_version(&mut self, id: VersionId) -> Result<Option<ProjectVersion>, StoreError> {
        let sql = format!("SELECT {VERSION_COLUMNS} FROM project_versions WHERE id = $1 AND deleted IS NULL");
        let row = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(VersionRow::into_record).transpose()
    }

    async fn insert_version(&mut self, v: &ProjectVersion) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO project_versions ({VERSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(Uuid::from(v.id))
            .bind(Uuid::from(v.project_id))
            .bind(v.status.as_str())
            .bind(Json(&v.data))
            .bind(v.ra_compulsory)
            .bind(v.asru_version)
            .bind(v.licence_holder_id.map(Uuid::from))
            .bind(v.created_at)
            .bind(v.updated_at)
            .bind(v.deleted)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_version(&mut self, v: &ProjectVersion) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE project_versions SET status = $2, data = $3, ra_compulsory = $4, asru_version = $5,
             licence_holder_id = $6, updated_at = $7, deleted = $8
             WHERE id = $1",
        )
        .bind(Uuid::from(v.id))
        .bind(v.status.as_str())
        .bind(Json(&v.data))
        .bind(v.ra_compulsory)
        .bind(v.asru_version)
        .bind(v.licence_holder_id.map(Uuid::from))
        .bind(v.updated_at)
        .bind(v.deleted)
        .execute(&mut *self.tx)
        .await?;
        require_row(result.rows_affected(), "version", v.id)
    }

    async fn project_versions(&mut self, project_id: ProjectId) -> Result<Vec<ProjectVersion>, StoreError> {
        self.fetch_versions(project_id, false).await
    }

    async fn project_versions_including_deleted(
        &mut self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectVersion>, StoreError> {
        self.fetch_versions(project_id, true).await
    }

    // ─── Additional availability ─────────────────────────────────────

    async fn project_establishments(&mut self, project_id: ProjectId) -> Result<Vec<ProjectEstablishment>, StoreError> {
        let sql = format!(
            "SELECT {SITE_COLUMNS} FROM project_establishments WHERE project_id = $1
             ORDER BY establishment_id
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, SiteRow>(&sql)
            .bind(Uuid::from(project_id))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(SiteRow::into_record).collect()
    }

    async fn insert_project_establishment(&mut self, row: &ProjectEstablishment) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO project_establishments ({SITE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&sql)
            .bind(row.id)
            .bind(Uuid::from(row.project_id))
            .bind(Uuid::from(row.establishment_id))
            .bind(row.status.as_str())
            .bind(row.version_id.map(Uuid::from))
            .bind(row.issue_date)
            .bind(row.revoked_date)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_project_establishment(&mut self, row: &ProjectEstablishment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE project_establishments SET status = $2, version_id = $3, issue_date = $4, revoked_date = $5
             WHERE id = $1",
        )
        .bind(row.id)
        .bind(row.status.as_str())
        .bind(row.version_id.map(Uuid::from))
        .bind(row.issue_date)
        .bind(row.revoked_date)
        .execute(&mut *self.tx)
        .await?;
        require_row(result.rows_affected(), "project establishment", row.id)
    }

    async fn remove_project_establishment(&mut self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM project_establishments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    // ─── Retrospective assessments ───────────────────────────────────

    async fn get_ra(&mut self, id: Uuid) -> Result<Option<RetrospectiveAssessment>, StoreError> {
        let sql = format!("SELECT {RA_COLUMNS} FROM retrospective_assessments WHERE id = $1 AND deleted IS NULL");
        let row = sqlx::query_as::<_, RaRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(RaRow::into_record).transpose()
    }

    async fn insert_ra(&mut self, ra: &RetrospectiveAssessment) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO retrospective_assessments ({RA_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&sql)
            .bind(ra.id)
            .bind(Uuid::from(ra.project_id))
            .bind(ra.status.as_str())
            .bind(Json(&ra.data))
            .bind(ra.created_at)
            .bind(ra.updated_at)
            .bind(ra.deleted)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_ra(&mut self, ra: &RetrospectiveAssessment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE retrospective_assessments SET status = $2, data = $3, updated_at = $4, deleted = $5
             WHERE id = $1",
        )
        .bind(ra.id)
        .bind(ra.status.as_str())
        .bind(Json(&ra.data))
        .bind(ra.updated_at)
        .bind(ra.deleted)
        .execute(&mut *self.tx)
        .await?;
        require_row(result.rows_affected(), "retrospective assessment", ra.id)
    }

    async fn project_ras(&mut self, project_id: ProjectId) -> Result<Vec<RetrospectiveAssessment>, StoreError> {
        let sql = format!(
            "SELECT {RA_COLUMNS} FROM retrospective_assessments
             WHERE project_id = $1 AND deleted IS NULL
             ORDER BY created_at, seq"
        );
        let rows = sqlx::query_as::<_, RaRow>(&sql)
            .bind(Uuid::from(project_id))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(RaRow::into_record).collect()
    }

    // ─── Reminders ───────────────────────────────────────────────────

    async fn get_reminder(&mut self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        self.fetch_reminder(id, false).await
    }

    async fn get_reminder_including_deleted(&mut self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        self.fetch_reminder(id, true).await
    }

    async fn insert_reminder(&mut self, r: &Reminder) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO reminders ({REMINDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)");
        sqlx::query(&sql)
            .bind(r.id)
            .bind(&r.model_type)
            .bind(r.model_id)
            .bind(Uuid::from(r.establishment_id))
            .bind(&r.condition_key)
            .bind(r.deadline)
            .bind(r.status.as_str())
            .bind(r.deleted)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_reminder(&mut self, r: &Reminder) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE reminders SET model_type = $2, model_id = $3, establishment_id = $4, condition_key = $5,
             deadline = $6, status = $7, deleted = $8
             WHERE id = $1",
        )
        .bind(r.id)
        .bind(&r.model_type)
        .bind(r.model_id)
        .bind(Uuid::from(r.establishment_id))
        .bind(&r.condition_key)
        .bind(r.deadline)
        .bind(r.status.as_str())
        .bind(r.deleted)
        .execute(&mut *self.tx)
        .await?;
        require_row(result.rows_affected(), "reminder", r.id)
    }

    async fn reminders_for(&mut self, model_id: Uuid) -> Result<Vec<Reminder>, StoreError> {
        let sql = format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE model_id = $1 AND deleted IS NULL ORDER BY deadline"
        );
        let rows = sqlx::query_as::<_, ReminderRow>(&sql)
            .bind(model_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(ReminderRow::into_record).collect()
    }

    async fn insert_dismissal(&mut self, d: &ReminderDismissal) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO reminder_dismissals (id, reminder_id, profile_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(d.id)
        .bind(d.reminder_id)
        .bind(Uuid::from(d.profile_id))
        .bind(d.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn dismissals_for(&mut self, reminder_id: Uuid) -> Result<Vec<ReminderDismissal>, StoreError> {
        let rows = sqlx::query_as::<_, DismissalRow>(
            "SELECT id, reminder_id, profile_id, created_at FROM reminder_dismissals
             WHERE reminder_id = $1 ORDER BY created_at",
        )
        .bind(reminder_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(DismissalRow::into_record).collect())
    }

    // ─── Changelog ───────────────────────────────────────────────────

    async fn insert_changelog(&mut self, e: &ChangelogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO changelog (id, message_id, establishment_id, model_id, model_type, action, changed_by, state, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(e.id)
        .bind(&e.message_id)
        .bind(e.establishment_id)
        .bind(e.model_id)
        .bind(&e.model_type)
        .bind(&e.action)
        .bind(e.changed_by)
        .bind(&e.state)
        .bind(e.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    // ─── Generic records ─────────────────────────────────────────────

    async fn get_record(&mut self, model: &str, id: Uuid) -> Result<Option<GenericRecord>, StoreError> {
        self.fetch_record(model, id, false).await
    }

    async fn get_record_including_deleted(&mut self, model: &str, id: Uuid) -> Result<Option<GenericRecord>, StoreError> {
        self.fetch_record(model, id, true).await
    }

    async fn insert_record(&mut self, r: &GenericRecord) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO records ({RECORD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
        sqlx::query(&sql)
            .bind(r.id)
            .bind(&r.model)
            .bind(Json(&r.data))
            .bind(r.created_at)
            .bind(r.updated_at)
            .bind(r.deleted)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_record(&mut self, r: &GenericRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE records SET data = $3, updated_at = $4, deleted = $5 WHERE id = $1 AND model = $2",
        )
        .bind(r.id)
        .bind(&r.model)
        .bind(Json(&r.data))
        .bind(r.updated_at)
        .bind(r.deleted)
        .execute(&mut *self.tx)
        .await?;
        require_row(result.rows_affected(), "record", r.id)
    }

    async fn find_records(&mut self, model: &str, filter: &Map<String, Value>) -> Result<Vec<GenericRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE model = $1 AND deleted IS NULL AND data @> $2
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(model)
            .bind(Json(filter))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(RecordRow::into_record).collect())
    }
}

// ─── Row types ───────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    status: String,
    establishment_id: Uuid,
    licence_holder_id: Option<Uuid>,
    title: Option<String>,
    licence_number: Option<String>,
    issue_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    amended_date: Option<DateTime<Utc>>,
    revocation_date: Option<DateTime<Utc>>,
    ra_date: Option<DateTime<Utc>>,
    ra_granted_date: Option<DateTime<Utc>>,
    species: Vec<String>,
    is_legacy_stub: bool,
    schema_version: i32,
    previous_establishment_id: Option<Uuid>,
    previous_project_id: Option<Uuid>,
    transfer_establishment_id: Option<Uuid>,
    transfer_project_id: Option<Uuid>,
    transferred_in_date: Option<DateTime<Utc>>,
    transferred_out_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: Option<DateTime<Utc>>,
}

impl ProjectRow {
    fn into_record(self) -> Result<Project, StoreError> {
        Ok(Project {
            id: self.id.into(),
            status: self.status.parse()?,
            establishment_id: self.establishment_id.into(),
            licence_holder_id: self.licence_holder_id.map(Into::into),
            title: self.title,
            licence_number: self.licence_number,
            issue_date: self.issue_date,
            expiry_date: self.expiry_date,
            amended_date: self.amended_date,
            revocation_date: self.revocation_date,
            ra_date: self.ra_date,
            ra_granted_date: self.ra_granted_date,
            species: self.species,
            is_legacy_stub: self.is_legacy_stub,
            schema_version: self.schema_version,
            previous_establishment_id: self.previous_establishment_id.map(Into::into),
            previous_project_id: self.previous_project_id.map(Into::into),
            transfer_establishment_id: self.transfer_establishment_id.map(Into::into),
            transfer_project_id: self.transfer_project_id.map(Into::into),
            transferred_in_date: self.transferred_in_date,
            transferred_out_date: self.transferred_out_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    project_id: Uuid,
    status: String,
    data: Value,
    ra_compulsory: bool,
    asru_version: bool,
    licence_holder_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: Option<DateTime<Utc>>,
}

impl VersionRow {
    fn into_record(self) -> Result<ProjectVersion, StoreError> {
        Ok(ProjectVersion {
            id: self.id.into(),
            project_id: self.project_id.into(),
            status: self.status.parse()?,
            data: VersionData::from(self.data),
            ra_compulsory: self.ra_compulsory,
            asru_version: self.asru_version,
            licence_holder_id: self.licence_holder_id.map(Into::into),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SiteRow {
    id: Uuid,
    project_id: Uuid,
    establishment_id: Uuid,
    status: String,
    version_id: Option<Uuid>,
    issue_date: Option<DateTime<Utc>>,
    revoked_date: Option<DateTime<Utc>>,
}

impl SiteRow {
    fn into_record(self) -> Result<ProjectEstablishment, StoreError> {
        Ok(ProjectEstablishment {
            id: self.id,
            project_id: self.project_id.into(),
            establishment_id: self.establishment_id.into(),
            status: self.status.parse()?,
            version_id: self.version_id.map(Into::into),
            issue_date: self.issue_date,
            revoked_date: self.revoked_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RaRow {
    id: Uuid,
    project_id: Uuid,
    status: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: Option<DateTime<Utc>>,
}

impl RaRow {
    fn into_record(self) -> Result<RetrospectiveAssessment, StoreError> {
        Ok(RetrospectiveAssessment {
            id: self.id,
            project_id: self.project_id.into(),
            status: self.status.parse()?,
            data: VersionData::from(self.data),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReminderRow {
    id: Uuid,
    model_type: String,
    model_id: Uuid,
    establishment_id: Uuid,
    condition_key: String,
    deadline: NaiveDate,
    status: String,
    deleted: Option<DateTime<Utc>>,
}

impl ReminderRow {
    fn into_record(self) -> Result<Reminder, StoreError> {
        Ok(Reminder {
            id: self.id,
            model_type: self.model_type,
            model_id: self.model_id,
            establishment_id: self.establishment_id.into(),
            condition_key: self.condition_key,
            deadline: self.deadline,
            status: self.status.parse()?,
            deleted: self.deleted,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DismissalRow {
    id: Uuid,
    reminder_id: Uuid,
    profile_id: Uuid,
    created_at: DateTime<Utc>,
}

impl DismissalRow {
    fn into_record(self) -> ReminderDismissal {
        ReminderDismissal {
            id: self.id,
            reminder_id: self.reminder_id,
            profile_id: self.profile_id.into(),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    model: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: Option<DateTime<Utc>>,
}

impl RecordRow {
    fn into_record(self) -> GenericRecord {
        let data = match self.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        GenericRecord {
            id: self.id,
            model: self.model,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        }
    }
}
