//! # Message Envelopes
//!
//! A queue message carries `{"key": "..."}`; the key names the blob holding
//! the change-request body. A body is either the request JSON itself or a
//! legacy `{"secure": true, "payload": "..."}` wrapper around it.

use serde::Deserialize;
use serde_json::Value;

use asl_resolvers::ChangeRequest;

use crate::error::ProcessError;
use crate::secure::SecureKey;

/// One message as delivered by a [`MessageSource`](crate::queue::MessageSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
}

impl QueueMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// The parsed queue body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    pub key: String,
}

impl Envelope {
    pub fn parse(message: &QueueMessage) -> Result<Self, ProcessError> {
        let envelope: Self = serde_json::from_str(&message.body).map_err(ProcessError::Envelope)?;
        if envelope.key.trim().is_empty() {
            return Err(ProcessError::EmptyKey);
        }
        Ok(envelope)
    }
}

/// Decode a fetched blob into a change request, decrypting the secure
/// variant with `key`.
pub fn decode_body(bytes: &[u8], key: Option<&SecureKey>) -> Result<ChangeRequest, ProcessError> {
    let value: Value = serde_json::from_slice(bytes).map_err(ProcessError::Body)?;
    if value.get("secure").and_then(Value::as_bool) != Some(true) {
        return serde_json::from_value(value).map_err(ProcessError::Body);
    }

    let key = key.ok_or(ProcessError::NoSecureKey)?;
    let payload = value
        .get("payload")
        .and_then(Value::as_str)
        .ok_or(ProcessError::MissingPayload)?;
    let plaintext = key.decrypt(payload)?;
    serde_json::from_slice(&plaintext).map_err(ProcessError::Body)
}
