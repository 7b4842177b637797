//! Licence and draft transfers between establishments.

mod common;

use serde_json::json;
use uuid::Uuid;

use asl_core::{EstablishmentId, ProjectId};
use asl_resolvers::ChangeRequest;
use asl_state::{AvailabilityStatus, ProjectStatus, VersionStatus};
use asl_store::{Store, Transaction};

use common::Harness;

#[tokio::test]
async fn transfer_moves_licence_to_new_project() {
    let mut h = Harness::new();
    let destination = EstablishmentId::new();
    let extra_site = Uuid::new_v4();
    let id = h
        .create_project(json!({
            "title": "Zebrafish",
            "other-establishments": true,
            "establishments": [{"establishment-id": extra_site.to_string()}],
            "conditions": [{"key": "poles"}],
        }))
        .await;
    let original = h.submit_and_grant(id).await;

    h.project_action(id, "fork").await.unwrap();
    let draft = h.latest(id).await;
    h.ok(ChangeRequest::new("projectVersion", "patch").with_id(draft.id).with_data(json!({
        "transferToEstablishment": destination.to_string(),
        "transferToEstablishmentName": "Elsewhere",
    })))
    .await;
    h.project_action(id, "submit-draft").await.unwrap();

    let resolution = h.project_action(id, "transfer").await.unwrap();
    let new_id = ProjectId::from_uuid(resolution.model_id.unwrap());
    assert_ne!(new_id, id);
    assert_eq!(resolution.establishment_id, Some(*destination.as_uuid()));

    let old = h.project(id).await;
    assert_eq!(old.status, ProjectStatus::Transferred);
    assert_eq!(old.transfer_project_id, Some(new_id));
    assert_eq!(old.transfer_establishment_id, Some(destination));
    assert!(old.transferred_out_date.is_some());

    let new = h.project(new_id).await;
    assert_eq!(new.status, ProjectStatus::Active);
    assert_eq!(new.establishment_id, destination);
    assert_eq!(new.previous_project_id, Some(id));
    assert_eq!(new.previous_establishment_id, Some(h.establishment));
    assert_eq!(new.licence_number, original.licence_number);
    assert_eq!(new.issue_date, original.issue_date);
    assert_eq!(new.title.as_deref(), Some("Zebrafish"));

    let versions = h.versions(new_id).await;
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].status, VersionStatus::Granted);
    assert!(versions[0].data.transfer_destination().is_none());
    assert!(versions[0].data.get("transferToEstablishmentName").is_none());

    let mut tx = h.store.begin().await.unwrap();
    let rows = tx.project_establishments(new_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(*rows[0].establishment_id.as_uuid(), extra_site);
    assert_eq!(rows[0].status, AvailabilityStatus::Active);
    assert!(tx.licence_number_in_use(original.licence_number.as_deref().unwrap()).await.unwrap());
}

#[tokio::test]
async fn transfer_requires_submitted_version() {
    let mut h = Harness::new();
    let id = h.create_project(json!({})).await;
    h.submit_and_grant(id).await;

    let err = h
        .apply(ChangeRequest::new("project", "transfer").with_id(id).with_data(json!({
            "establishmentId": EstablishmentId::new().to_string(),
        })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
    assert_eq!(h.project(id).await.status, ProjectStatus::Active);
}

#[tokio::test]
async fn transfer_without_destination_is_rejected() {
    let mut h = Harness::new();
    let id = h.create_project(json!({})).await;
    h.submit_and_grant(id).await;
    h.project_action(id, "fork").await.unwrap();
    h.project_action(id, "submit-draft").await.unwrap();

    let err = h.project_action(id, "transfer").await.unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[tokio::test]
async fn transfer_draft_requires_permission_at_destination() {
    let mut h = Harness::new();
    let holder = Uuid::new_v4();
    let destination = EstablishmentId::new();
    let resolution = h
        .ok(ChangeRequest::new("project", "create").with_data(json!({
            "establishmentId": h.establishment.to_string(),
            "licenceHolderId": holder.to_string(),
        })))
        .await;
    let id = ProjectId::from_uuid(resolution.model_id.unwrap());
    let request = ChangeRequest::new("project", "transfer-draft")
        .with_id(id)
        .with_data(json!({"establishmentId": destination.to_string()}));

    let err = h.apply(request.clone()).await.unwrap_err();
    assert_eq!(err.kind(), "not_associated");
    assert_eq!(h.project(id).await.establishment_id, h.establishment);

    h.seed_record(
        "permission",
        json!({"profileId": holder.to_string(), "establishmentId": destination.to_string(), "role": "basic"}),
    )
    .await;
    h.ok(request).await;
    assert_eq!(h.project(id).await.establishment_id, destination);
}

#[tokio::test]
async fn transfer_draft_refuses_granted_project() {
    let mut h = Harness::new();
    let id = h.create_project(json!({})).await;
    h.submit_and_grant(id).await;

    let err = h
        .apply(ChangeRequest::new("project", "transfer-draft").with_id(id).with_data(json!({
            "establishmentId": EstablishmentId::new().to_string(),
        })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
}
