//! Shared fixtures: a memory store, a stepping clock, and request helpers.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use asl_core::{EstablishmentId, ProjectId};
use asl_resolvers::{resolve, ChangeRequest, Resolution, ResolverError};
use asl_store::{MemoryStore, Project, ProjectVersion, Store, Transaction};

pub struct Harness {
    pub store: MemoryStore,
    pub now: DateTime<Utc>,
    pub establishment: EstablishmentId,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            now: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            establishment: EstablishmentId::new(),
        }
    }

    /// Run one request in its own transaction, committing on success.
    /// The clock moves forward a minute per call.
    pub async fn apply(&mut self, request: ChangeRequest) -> Result<Resolution, ResolverError> {
        self.now += Duration::minutes(1);
        let mut tx = self.store.begin().await.unwrap();
        match resolve(&mut tx, &request, self.now).await {
            Ok(resolution) => {
                tx.commit().await.unwrap();
                Ok(resolution)
            }
            Err(err) => {
                tx.rollback().await.unwrap();
                Err(err)
            }
        }
    }

    pub async fn ok(&mut self, request: ChangeRequest) -> Resolution {
        let label = format!("{} {}", request.model, request.action);
        self.apply(request)
            .await
            .unwrap_or_else(|e| panic!("{label} failed: {e}"))
    }

    /// A new application whose first draft holds `version`.
    pub async fn create_project(&mut self, version: Value) -> ProjectId {
        let resolution = self
            .ok(ChangeRequest::new("project", "create").with_data(json!({
                "establishmentId": self.establishment.to_string(),
                "version": version,
            })))
            .await;
        ProjectId::from_uuid(resolution.model_id.unwrap())
    }

    pub async fn project_action(&mut self, id: ProjectId, action: &str) -> Result<Resolution, ResolverError> {
        self.apply(ChangeRequest::new("project", action).with_id(id)).await
    }

    pub async fn submit_and_grant(&mut self, id: ProjectId) -> Project {
        self.project_action(id, "submit-draft").await.unwrap();
        self.project_action(id, "grant").await.unwrap();
        self.project(id).await
    }

    pub async fn project(&self, id: ProjectId) -> Project {
        let mut tx = self.store.begin().await.unwrap();
        tx.get_project_including_deleted(id).await.unwrap().unwrap()
    }

    pub async fn versions(&self, id: ProjectId) -> Vec<ProjectVersion> {
        let mut tx = self.store.begin().await.unwrap();
        tx.project_versions(id).await.unwrap()
    }

    pub async fn latest(&self, id: ProjectId) -> ProjectVersion {
        self.versions(id).await.pop().unwrap()
    }

    /// Insert a generic record directly.
    pub async fn seed_record(&self, model: &str, data: Value) -> Uuid {
        let record = asl_store::GenericRecord {
            id: Uuid::new_v4(),
            model: model.to_string(),
            data: data.as_object().cloned().unwrap(),
            created_at: self.now,
            updated_at: self.now,
            deleted: None,
        };
        let mut tx = self.store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.commit().await.unwrap();
        record.id
    }

    /// A profile record flagged as a regulator user.
    pub async fn asru_profile(&self) -> Uuid {
        self.seed_record(
            "profile",
            json!({"firstName": "Ada", "lastName": "Inspector", "email": "ada@example.org", "asruUser": true}),
        )
        .await
    }
}
