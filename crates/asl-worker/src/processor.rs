//! # Transactional Message Processor
//!
//! One message, one transaction:
//!
//! 1. parse the envelope and fetch the body from the blob store;
//! 2. open a transaction and hand the request to the resolvers;
//! 3. on success, append the success changelog row in that transaction
//!    and commit;
//! 4. on any failure, roll back, then append an error changelog row in a
//!    fresh transaction so the record survives the rollback. A failed
//!    rollback is logged; the row still records the original cause.
//!
//! A message whose body could not be obtained is recorded under model
//! `unknown`. Transient blob store failures are the exception: those
//! messages stay unacknowledged and the queue redelivers them.

use std::time::Instant;

use chrono::Utc;
use tracing::Instrument;

use asl_resolvers::{changelog, resolve, ChangeRequest, Resolution};
use asl_store::{ChangelogEntry, Store, StoreError, Transaction};

use crate::blob::BlobStore;
use crate::envelope::{decode_body, Envelope, QueueMessage};
use crate::error::ProcessError;
use crate::metrics;
use crate::queue::{MessageSource, QueueError};
use crate::secure::SecureKey;

/// How a message was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Applied and committed with its success changelog row.
    Committed,
    /// Rolled back; an error changelog row was attempted.
    Failed,
    /// Left for redelivery.
    Retry,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Failed => "failed",
            Self::Retry => "retry",
        }
    }

    /// Whether the message should be removed from the queue.
    pub fn acknowledge(self) -> bool {
        !matches!(self, Self::Retry)
    }
}

/// Applies queue messages to a store.
#[derive(Debug, Clone)]
pub struct Processor<S, B> {
    store: S,
    blobs: B,
    secure_key: Option<SecureKey>,
}

impl<S: Store, B: BlobStore> Processor<S, B> {
    pub fn new(store: S, blobs: B, secure_key: Option<SecureKey>) -> Self {
        Self {
            store,
            blobs,
            secure_key,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive up to `max` messages, settle each, and acknowledge the
    /// settled ones. Returns how many were received.
    pub async fn drain<Q: MessageSource>(&self, queue: &Q, max: usize) -> Result<usize, QueueError> {
        let batch = queue.receive(max).await?;
        for message in &batch {
            if self.process(message).await.acknowledge() {
                queue.acknowledge(message).await?;
            }
        }
        Ok(batch.len())
    }

    /// Settle one message.
    pub async fn process(&self, message: &QueueMessage) -> Outcome {
        let started = Instant::now();
        let span = tracing::info_span!("message", message_id = %message.message_id);
        let outcome = self.settle(message).instrument(span).await;
        metrics::record(outcome, started.elapsed());
        outcome
    }

    async fn settle(&self, message: &QueueMessage) -> Outcome {
        let request = match self.load(message).await {
            Ok(request) => request,
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "body unavailable, leaving message for redelivery");
                return Outcome::Retry;
            }
            Err(err) => {
                tracing::warn!(error = %err, "message body could not be loaded");
                self.record_failure(message, None, &err).await;
                return Outcome::Failed;
            }
        };

        match self.apply(message, &request).await {
            Ok(resolution) => {
                tracing::info!(
                    model = %request.model,
                    action = %request.action,
                    model_id = ?resolution.model_id,
                    "change request applied"
                );
                Outcome::Committed
            }
            Err(err) => {
                tracing::warn!(model = %request.model, action = %request.action, error = %err, "change request failed");
                self.record_failure(message, Some(&request), &err).await;
                Outcome::Failed
            }
        }
    }

    async fn load(&self, message: &QueueMessage) -> Result<ChangeRequest, ProcessError> {
        let envelope = Envelope::parse(message)?;
        let bytes = self.blobs.fetch(&envelope.key).await?;
        decode_body(&bytes, self.secure_key.as_ref())
    }

    async fn apply(&self, message: &QueueMessage, request: &ChangeRequest) -> Result<Resolution, ProcessError> {
        let mut tx = self.store.begin().await?;
        match apply_in(&mut tx, message, request).await {
            Ok(resolution) => {
                tx.commit().await?;
                Ok(resolution)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, cause = %err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Append the error row in its own transaction. A failure here is
    /// logged and dropped.
    async fn record_failure(&self, message: &QueueMessage, request: Option<&ChangeRequest>, err: &ProcessError) {
        let entry = changelog::failure(&message.message_id, request, err, Utc::now());
        if let Err(write_err) = self.write_changelog(&entry).await {
            tracing::error!(
                error = %write_err,
                original_error = %err,
                "failed to record change request failure"
            );
        }
    }

    async fn write_changelog(&self, entry: &ChangelogEntry) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;
        tx.insert_changelog(entry).await?;
        tx.commit().await
    }
}

async fn apply_in<T: Transaction>(
    tx: &mut T,
    message: &QueueMessage,
    request: &ChangeRequest,
) -> Result<Resolution, ProcessError> {
    let now = Utc::now();
    let resolution = resolve(tx, request, now).await?;
    tx.insert_changelog(&changelog::success(&message.message_id, request, &resolution, now))
        .await?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retry_stays_on_the_queue() {
        assert!(Outcome::Committed.acknowledge());
        assert!(Outcome::Failed.acknowledge());
        assert!(!Outcome::Retry.acknowledge());
    }
}
