//! End-to-end message settlement against the in-memory collaborators.

use serde_json::{json, Value};
use uuid::Uuid;

use asl_core::{EstablishmentId, ProjectId};
use asl_store::{MemoryStore, Store, Transaction};
use asl_worker::blob::MemoryBlobStore;
use asl_worker::envelope::QueueMessage;
use asl_worker::queue::MemoryQueue;
use asl_worker::secure::SecureKey;
use asl_worker::{Outcome, Processor};

struct Worker {
    processor: Processor<MemoryStore, MemoryBlobStore>,
    store: MemoryStore,
    blobs: MemoryBlobStore,
    queue: MemoryQueue,
}

impl Worker {
    fn new(secure_key: Option<SecureKey>) -> Self {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new();
        Self {
            processor: Processor::new(store.clone(), blobs.clone(), secure_key),
            store,
            blobs,
            queue: MemoryQueue::new(),
        }
    }

    /// Store `body` under a fresh key and enqueue a message pointing at it.
    async fn send(&self, message_id: &str, body: Value) {
        let key = format!("requests/{message_id}.json");
        self.blobs.put(key.clone(), body.to_string()).await;
        self.queue
            .push(QueueMessage::new(message_id, json!({ "key": key }).to_string()))
            .await;
    }

    async fn drain(&self) -> usize {
        self.processor.drain(&self.queue, 10).await.unwrap()
    }
}

fn place_body(establishment: EstablishmentId) -> Value {
    json!({
        "model": "place",
        "action": "create",
        "changedBy": Uuid::new_v4().to_string(),
        "data": {"establishmentId": establishment.to_string(), "site": "Main", "name": "Room 1"},
    })
}

#[tokio::test]
async fn success_commits_mutation_with_one_changelog_row() {
    let worker = Worker::new(None);
    worker.send("m-1", place_body(EstablishmentId::new())).await;

    assert_eq!(worker.drain().await, 1);

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 1);
    let entry = &changelog[0];
    assert!(!entry.is_error());
    assert_eq!(entry.message_id, "m-1");
    assert_eq!(entry.model_type, "place");
    assert_eq!(entry.action, "create");
    assert!(entry.changed_by.is_some());

    let mut tx = worker.store.begin().await.unwrap();
    let record = tx.get_record("place", entry.model_id.unwrap()).await.unwrap();
    assert!(record.is_some());
    drop(tx);
    assert!(worker.queue.in_flight().await.is_empty());
}

#[tokio::test]
async fn failure_rolls_back_and_records_one_error_row() {
    let worker = Worker::new(None);
    worker
        .send(
            "m-1",
            json!({
                "model": "project",
                "action": "create",
                "data": {"establishmentId": EstablishmentId::new().to_string(), "version": {"title": "T"}},
            }),
        )
        .await;
    worker.drain().await;
    let project_id = ProjectId::from_uuid(worker.store.changelog().await[0].model_id.unwrap());
    let draft = {
        let mut tx = worker.store.begin().await.unwrap();
        tx.project_versions(project_id).await.unwrap().pop().unwrap()
    };

    // The version is written before the malformed reminder is rejected.
    worker
        .send(
            "m-2",
            json!({
                "model": "projectVersion",
                "action": "update-conditions",
                "id": draft.id.to_string(),
                "data": {"conditions": [{
                    "key": "poles",
                    "reminders": {"active": ["poles"], "poles": [{"id": Uuid::new_v4().to_string()}]}
                }]},
            }),
        )
        .await;
    assert_eq!(worker.drain().await, 1);

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 2);
    let entry = &changelog[1];
    assert!(entry.is_error());
    assert_eq!(entry.message_id, "m-2");
    assert_eq!(entry.model_type, "projectVersion");
    assert_eq!(entry.state["action"], json!("update-conditions"));
    assert_eq!(entry.state["id"], json!(draft.id.to_string()));
    assert!(entry.state["message"].as_str().unwrap().contains("deadline"));

    let mut tx = worker.store.begin().await.unwrap();
    let version = tx.get_version(draft.id).await.unwrap().unwrap();
    assert_eq!(version.data, draft.data);
    assert!(tx.reminders_for(*project_id.as_uuid()).await.unwrap().is_empty());
    drop(tx);
    assert!(worker.queue.in_flight().await.is_empty());
}

#[tokio::test]
async fn unknown_model_is_recorded_under_its_name() {
    let worker = Worker::new(None);
    worker.send("m-1", json!({"model": "spaceship", "action": "launch"})).await;
    worker.drain().await;

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 1);
    assert!(changelog[0].is_error());
    assert_eq!(changelog[0].model_type, "spaceship");
    assert!(changelog[0].state["message"].as_str().unwrap().contains("unknown model"));
}

#[tokio::test]
async fn undeliverable_bodies_are_recorded_as_unknown_and_acknowledged() {
    let worker = Worker::new(None);
    worker.queue.push(QueueMessage::new("bad-envelope", "not json")).await;
    worker
        .queue
        .push(QueueMessage::new("missing-blob", json!({"key": "requests/nowhere.json"}).to_string()))
        .await;
    assert_eq!(worker.drain().await, 2);

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 2);
    for (entry, id) in changelog.iter().zip(["bad-envelope", "missing-blob"]) {
        assert!(entry.is_error());
        assert_eq!(entry.message_id, id);
        assert_eq!(entry.model_type, "unknown");
        assert!(entry.state["action"].is_null());
    }
    assert!(worker.queue.in_flight().await.is_empty());
}

#[tokio::test]
async fn unavailable_blob_store_leaves_message_for_redelivery() {
    let worker = Worker::new(None);
    worker.send("m-1", place_body(EstablishmentId::new())).await;
    worker.blobs.set_unavailable(true).await;

    let message = QueueMessage::new("m-1", json!({"key": "requests/m-1.json"}).to_string());
    assert_eq!(worker.processor.process(&message).await, Outcome::Retry);

    worker.drain().await;
    assert!(worker.store.changelog().await.is_empty());
    assert_eq!(worker.queue.in_flight().await.len(), 1);

    worker.blobs.set_unavailable(false).await;
    worker.queue.redeliver().await;
    worker.drain().await;
    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 1);
    assert!(!changelog[0].is_error());
    assert!(worker.queue.in_flight().await.is_empty());
}

#[tokio::test]
async fn secure_payload_is_decrypted_with_configured_key() {
    let key = SecureKey::from_bytes(&[42u8; 32]).unwrap();
    let worker = Worker::new(Some(key.clone()));
    let payload = key
        .encrypt(place_body(EstablishmentId::new()).to_string().as_bytes())
        .unwrap();
    worker.send("m-1", json!({"secure": true, "payload": payload})).await;
    worker.drain().await;

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 1);
    assert_eq!(changelog[0].action, "create");
    assert_eq!(changelog[0].model_type, "place");
}

#[tokio::test]
async fn secure_payload_without_key_is_recorded() {
    let key = SecureKey::from_bytes(&[42u8; 32]).unwrap();
    let worker = Worker::new(None);
    let payload = key.encrypt(b"{}").unwrap();
    worker.send("m-1", json!({"secure": true, "payload": payload})).await;
    worker.drain().await;

    let changelog = worker.store.changelog().await;
    assert_eq!(changelog.len(), 1);
    assert!(changelog[0].is_error());
    assert_eq!(changelog[0].model_type, "unknown");
    assert!(changelog[0].state["message"].as_str().unwrap().contains("no decryption key"));
}
