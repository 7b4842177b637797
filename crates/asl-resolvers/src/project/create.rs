//! Project creation: new applications and digitised paper licences.

use serde_json::{Map, Value};

use asl_core::{EstablishmentId, ProfileId, ValidationError, VersionData};
use asl_rules::{extract_species, legacy_stub_expiry_date, ra_compulsory, ra_date, ra_required};
use asl_state::{ProjectStatus, VersionStatus};
use asl_store::{Project, ProjectVersion, Transaction};

use crate::error::ResolverError;
use crate::licence_number::{self, LicenceKind};
use crate::project::invalid;
use crate::request::{flag, opt_id, opt_str, opt_timestamp, req_str, Context};

/// Create a project and its first version.
pub async fn create<T: Transaction>(
    tx: &mut T,
    data: &Map<String, Value>,
    ctx: &Context,
) -> Result<Project, ResolverError> {
    let establishment_id = EstablishmentId::parse(req_str(data, "establishmentId")?)?;
    let licence_holder_id = opt_id(data, "licenceHolderId", ProfileId::parse)?;
    let version_data = match data.get("version") {
        Some(Value::Object(map)) => VersionData::from(map.clone()),
        _ => VersionData::new(),
    };

    let mut project = Project::new(establishment_id, ctx.now);
    project.licence_holder_id = licence_holder_id;
    project.title = opt_str(data, "title")
        .or_else(|| version_data.title())
        .map(str::to_string);

    let version = if flag(data, "isLegacyStub") {
        legacy_stub(tx, &mut project, data, version_data, ctx).await?
    } else {
        if let Some(v) = data.get("schemaVersion").and_then(Value::as_i64) {
            project.schema_version = i32::try_from(v).map_err(|_| invalid(format!("schemaVersion {v} out of range")))?;
        }
        let mut version = ProjectVersion::draft(project.id, version_data, ctx.now);
        version.licence_holder_id = licence_holder_id;
        version
    };

    tx.insert_project(&project).await?;
    tx.insert_version(&version).await?;
    tracing::info!(
        project_id = %project.id,
        status = %project.status,
        legacy_stub = project.is_legacy_stub,
        "project created"
    );
    Ok(project)
}

/// Fill in `project` from paper-record data and build its granted version.
async fn legacy_stub<T: Transaction>(
    tx: &mut T,
    project: &mut Project,
    data: &Map<String, Value>,
    mut version_data: VersionData,
    ctx: &Context,
) -> Result<ProjectVersion, ResolverError> {
    version_data.set("isLegacyStub", Value::Bool(true));

    let issue_date = opt_timestamp(data, "issueDate")?.ok_or(ValidationError::MissingField("issueDate"))?;
    let expiry_date = legacy_stub_expiry_date(issue_date, version_data.duration());

    let number = match opt_str(data, "licenceNumber").map(str::trim) {
        Some(number) => {
            if tx.licence_number_in_use(number).await? {
                return Err(invalid(format!("licence number {number} is already in use")));
            }
            number.to_string()
        }
        None => licence_number::generate(tx, LicenceKind::Project { schema_version: 0 }).await?,
    };
    project.licence_number = Some(number);
    project.status = if expiry_date > ctx.now {
        ProjectStatus::Active
    } else {
        ProjectStatus::Expired
    };
    project.is_legacy_stub = true;
    project.schema_version = 0;
    project.issue_date = Some(issue_date);
    project.expiry_date = Some(expiry_date);
    project.ra_date = ra_date(expiry_date, ra_required(&version_data));
    project.species = extract_species(&version_data, 0);

    let mut version = ProjectVersion::draft(project.id, version_data, ctx.now);
    version.status = VersionStatus::Granted;
    version.asru_version = true;
    version.ra_compulsory = ra_compulsory(&version.data);
    version.licence_holder_id = project.licence_holder_id;
    Ok(version)
}
