//! # Project Lifecycle State Machine
//!
//! Requests against the `project` model decode into a closed
//! [`ProjectRequest`] union; an unknown action or a missing id fails before
//! any storage access.
//!
//! "The current version" is never cached: each operation re-reads the
//! project's non-deleted versions inside its transaction and takes the one
//! created last.
//!
//! ## Modules
//!
//! - [`create`]: new applications and digitised legacy stubs.
//! - [`amend`]: fork, submit, update, issue date and licence number fixes,
//!   delete and delete-amendments.
//! - [`grant`]: grant, convert, revoke.
//! - [`transfer`]: transfer of a licence and of a draft.
//! - [`retrospective`]: the retrospective assessment sub-lifecycle.
//! - [`sites`] and [`reminders`]: reconciliation steps shared by the above.

pub mod amend;
pub mod create;
pub mod grant;
pub mod reminders;
pub mod retrospective;
pub mod sites;
pub mod transfer;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use asl_core::temporal::parse_timestamp;
use asl_core::{EstablishmentId, ProfileId, ProjectId, ValidationError, VersionData};
use asl_state::VersionStatus;
use asl_store::{Project, ProjectVersion, Transaction};

use crate::error::ResolverError;
use crate::request::{flag, opt_id, req_str, ChangeRequest, Context, Resolution};

/// Model name.
pub const MODEL: &str = "project";

/// A decoded request against the `project` model.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectRequest {
    Create { data: Map<String, Value> },
    Fork { id: ProjectId, preserve_status: bool },
    SubmitDraft { id: ProjectId },
    Grant { id: ProjectId },
    Revoke { id: ProjectId },
    Transfer { id: ProjectId, establishment_id: Option<EstablishmentId> },
    TransferDraft { id: ProjectId, establishment_id: EstablishmentId },
    Convert { id: ProjectId },
    Update { id: ProjectId, data: Map<String, Value> },
    UpdateIssueDate { id: ProjectId, issue_date: DateTime<Utc> },
    UpdateLicenceNumber { id: ProjectId, licence_number: String },
    Delete { id: ProjectId },
    DeleteAmendments { id: ProjectId },
    ForkRa { id: ProjectId, data: Option<VersionData> },
    SubmitRa { id: ProjectId },
    GrantRa { id: ProjectId },
    DeleteRa { id: ProjectId },
}

impl ProjectRequest {
    /// Decode from the wire shape.
    pub fn decode(request: &ChangeRequest) -> Result<Self, ResolverError> {
        let data = request.data_map();
        let action = request.action.as_str();

        // An unknown action is reported ahead of a missing id.
        let id = || -> Result<ProjectId, ResolverError> { Ok(ProjectId::parse(request.require_id()?)?) };

        Ok(match action {
            "create" => Self::Create { data },
            "fork" => Self::Fork {
                id: id()?,
                preserve_status: flag(&data, "preserveStatus"),
            },
            "submit-draft" => Self::SubmitDraft { id: id()? },
            "grant" => Self::Grant { id: id()? },
            "revoke" => Self::Revoke { id: id()? },
            "transfer" => Self::Transfer {
                id: id()?,
                establishment_id: opt_id(&data, "establishmentId", EstablishmentId::parse)?,
            },
            "transfer-draft" => Self::TransferDraft {
                id: id()?,
                establishment_id: EstablishmentId::parse(req_str(&data, "establishmentId")?)?,
            },
            "convert" => Self::Convert { id: id()? },
            "update" => Self::Update { id: id()?, data },
            "update-issue-date" => Self::UpdateIssueDate {
                id: id()?,
                issue_date: parse_timestamp(req_str(&data, "issueDate")?)?,
            },
            "update-licence-number" => Self::UpdateLicenceNumber {
                id: id()?,
                licence_number: req_str(&data, "licenceNumber")?.trim().to_string(),
            },
            "delete" => Self::Delete { id: id()? },
            "delete-amendments" => Self::DeleteAmendments { id: id()? },
            "fork-ra" => Self::ForkRa {
                id: id()?,
                data: data.get("data").cloned().map(VersionData::from),
            },
            "submit-ra" => Self::SubmitRa { id: id()? },
            "grant-ra" => Self::GrantRa { id: id()? },
            "delete-ra" => Self::DeleteRa { id: id()? },
            other => {
                return Err(ResolverError::UnknownAction {
                    model: MODEL.to_string(),
                    action: other.to_string(),
                })
            }
        })
    }
}

/// Apply a `project` change request.
pub async fn resolve<T: Transaction>(
    tx: &mut T,
    request: &ChangeRequest,
    ctx: &Context,
) -> Result<Resolution, ResolverError> {
    let decoded = ProjectRequest::decode(request)?;
    tracing::debug!(action = %request.action, "resolving project request");

    let project = match decoded {
        ProjectRequest::Create { data } => create::create(tx, &data, ctx).await?,
        ProjectRequest::Fork { id, preserve_status } => {
            amend::fork(tx, id, preserve_status, ctx).await?;
            load(tx, id).await?
        }
        ProjectRequest::SubmitDraft { id } => amend::submit_draft(tx, id, ctx).await?,
        ProjectRequest::Grant { id } => grant::grant(tx, id, ctx).await?,
        ProjectRequest::Revoke { id } => grant::revoke(tx, id, ctx).await?,
        ProjectRequest::Transfer { id, establishment_id } => transfer::transfer(tx, id, establishment_id, ctx).await?,
        ProjectRequest::TransferDraft { id, establishment_id } => {
            transfer::transfer_draft(tx, id, establishment_id, ctx).await?
        }
        ProjectRequest::Convert { id } => grant::convert(tx, id, ctx).await?,
        ProjectRequest::Update { id, data } => amend::update(tx, id, &data, ctx).await?,
        ProjectRequest::UpdateIssueDate { id, issue_date } => amend::update_issue_date(tx, id, issue_date, ctx).await?,
        ProjectRequest::UpdateLicenceNumber { id, licence_number } => {
            amend::update_licence_number(tx, id, &licence_number, ctx).await?
        }
        ProjectRequest::Delete { id } => return amend::delete(tx, id, ctx).await,
        ProjectRequest::DeleteAmendments { id } => return amend::delete_amendments(tx, id, ctx).await,
        ProjectRequest::ForkRa { id, data } => return retrospective::fork(tx, id, data, ctx).await,
        ProjectRequest::SubmitRa { id } => return retrospective::submit(tx, id, ctx).await,
        ProjectRequest::GrantRa { id } => return retrospective::grant(tx, id, ctx).await,
        ProjectRequest::DeleteRa { id } => return retrospective::delete(tx, id, ctx).await,
    };

    resolution(&project)
}

// ─── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn resolution(project: &Project) -> Result<Resolution, ResolverError> {
    Ok(Resolution::new(
        project.id,
        Some(*project.establishment_id.as_uuid()),
        serde_json::to_value(project)?,
    ))
}

/// A non-deleted project, or [`ResolverError::NotFound`].
pub(crate) async fn load<T: Transaction>(tx: &mut T, id: ProjectId) -> Result<Project, ResolverError> {
    tx.get_project(id)
        .await?
        .ok_or_else(|| ResolverError::not_found("project", id))
}

/// The most recently created non-deleted version.
pub(crate) async fn latest_version<T: Transaction>(tx: &mut T, id: ProjectId) -> Result<ProjectVersion, ResolverError> {
    tx.project_versions(id)
        .await?
        .pop()
        .ok_or_else(|| ResolverError::not_found("version of project", id))
}

/// The most recently created granted version, if any.
pub(crate) async fn latest_granted<T: Transaction>(
    tx: &mut T,
    id: ProjectId,
) -> Result<Option<ProjectVersion>, ResolverError> {
    Ok(tx
        .project_versions(id)
        .await?
        .into_iter()
        .rev()
        .find(|v| v.status == VersionStatus::Granted))
}

/// Whether the acting profile is a regulator (ASRU) user.
pub(crate) async fn is_asru<T: Transaction>(tx: &mut T, actor: Option<ProfileId>) -> Result<bool, ResolverError> {
    let Some(actor) = actor else {
        return Ok(false);
    };
    let profile = tx.get_record("profile", *actor.as_uuid()).await?;
    Ok(profile.is_some_and(|p| p.flag("asruUser")))
}

/// A [`ValidationError`] for a payload field with an unusable value.
pub(crate) fn invalid(message: impl Into<String>) -> ResolverError {
    ValidationError::Invalid(message.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "6f1f4a52-3a8c-4b51-9a3e-6a1d2c3b4e5f";

    #[test]
    fn decode_grant() {
        let req = ChangeRequest::new("project", "grant").with_id(ID);
        assert!(matches!(ProjectRequest::decode(&req), Ok(ProjectRequest::Grant { .. })));
    }

    #[test]
    fn decode_unknown_action() {
        let req = ChangeRequest::new("project", "teleport").with_id(ID);
        let err = ProjectRequest::decode(&req).unwrap_err();
        assert_eq!(err.kind(), "unknown_action");
    }

    #[test]
    fn decode_missing_id() {
        let req = ChangeRequest::new("project", "revoke");
        assert_eq!(ProjectRequest::decode(&req).unwrap_err().kind(), "missing_id");
    }

    #[test]
    fn decode_unknown_action_wins_over_missing_id() {
        let req = ChangeRequest::new("project", "teleport");
        assert_eq!(ProjectRequest::decode(&req).unwrap_err().kind(), "unknown_action");
    }

    #[test]
    fn decode_fork_preserve_status() {
        let req = ChangeRequest::new("project", "fork")
            .with_id(ID)
            .with_data(json!({"preserveStatus": true}));
        match ProjectRequest::decode(&req).unwrap() {
            ProjectRequest::Fork { preserve_status, .. } => assert!(preserve_status),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decode_transfer_draft_requires_establishment() {
        let req = ChangeRequest::new("project", "transfer-draft").with_id(ID);
        assert_eq!(ProjectRequest::decode(&req).unwrap_err().kind(), "validation");
    }

    #[test]
    fn decode_update_issue_date_parses_date() {
        let req = ChangeRequest::new("project", "update-issue-date")
            .with_id(ID)
            .with_data(json!({"issueDate": "2021-02-03"}));
        match ProjectRequest::decode(&req).unwrap() {
            ProjectRequest::UpdateIssueDate { issue_date, .. } => {
                assert_eq!(issue_date.to_rfc3339(), "2021-02-03T00:00:00+00:00")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
