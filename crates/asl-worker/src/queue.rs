//! # Message Sources
//!
//! A [`MessageSource`] hands out batches of messages and forgets them once
//! acknowledged. A received message that is never acknowledged becomes
//! visible again after the source's visibility timeout, which is how
//! redelivery happens; the processor itself never retries.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::envelope::QueueMessage;

/// Errors from the message source.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Inbound change-request messages.
pub trait MessageSource: Send + Sync {
    /// Up to `max` currently visible messages.
    fn receive(&self, max: usize) -> impl Future<Output = Result<Vec<QueueMessage>, QueueError>> + Send;

    /// Remove a settled message.
    fn acknowledge(&self, message: &QueueMessage) -> impl Future<Output = Result<(), QueueError>> + Send;
}

// ─── PostgreSQL ──────────────────────────────────────────────────────

/// Table-backed queue over `queue_messages`.
///
/// Receiving pushes each claimed row's `visible_at` forward by the
/// visibility timeout; `SKIP LOCKED` lets several workers poll the same
/// table without claiming the same row.
#[derive(Debug, Clone)]
pub struct PgQueue {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgQueue {
    pub fn new(pool: PgPool, visibility_timeout: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    message_id: String,
    body: String,
}

impl MessageSource for PgQueue {
    async fn receive(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let limit = i64::try_from(max).unwrap_or(i64::MAX);
        let rows: Vec<QueueRow> = sqlx::query_as(
            "UPDATE queue_messages \
             SET visible_at = NOW() + make_interval(secs => $2), receive_count = receive_count + 1 \
             WHERE seq IN ( \
                 SELECT seq FROM queue_messages \
                 WHERE visible_at <= NOW() \
                 ORDER BY seq \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING message_id, body",
        )
        .bind(limit)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| QueueMessage::new(row.message_id, row.body))
            .collect())
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM queue_messages WHERE message_id = $1")
            .bind(&message.message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ─── In-memory ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Messages {
    visible: VecDeque<QueueMessage>,
    in_flight: Vec<QueueMessage>,
}

/// Process-local queue for tests. Unacknowledged messages stay in flight
/// until [`MemoryQueue::redeliver`] makes them visible again.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    messages: Arc<Mutex<Messages>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, message: QueueMessage) {
        self.messages.lock().await.visible.push_back(message);
    }

    /// Messages received but not yet acknowledged.
    pub async fn in_flight(&self) -> Vec<QueueMessage> {
        self.messages.lock().await.in_flight.clone()
    }

    /// Messages waiting to be received.
    pub async fn visible(&self) -> usize {
        self.messages.lock().await.visible.len()
    }

    /// Expire every visibility timeout at once.
    pub async fn redeliver(&self) {
        let mut messages = self.messages.lock().await;
        let returned: Vec<QueueMessage> = messages.in_flight.drain(..).collect();
        messages.visible.extend(returned);
    }
}

impl MessageSource for MemoryQueue {
    async fn receive(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let mut messages = self.messages.lock().await;
        let take = max.min(messages.visible.len());
        let batch: Vec<QueueMessage> = messages.visible.drain(..take).collect();
        messages.in_flight.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<(), QueueError> {
        self.messages
            .lock()
            .await
            .in_flight
            .retain(|m| m.message_id != message.message_id);
        Ok(())
    }
}
