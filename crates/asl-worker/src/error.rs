//! # Processing Errors
//!
//! Everything that can stop one message from being applied. Resolver
//! errors pass through unchanged so the changelog records the resolver's
//! own message.

use thiserror::Error;

use asl_resolvers::ResolverError;
use asl_store::StoreError;

use crate::blob::BlobError;
use crate::secure::SecureError;

/// A message could not be applied.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("envelope has an empty blob key")]
    EmptyKey,

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("secure payload rejected: {0}")]
    Secure(#[from] SecureError),

    #[error("secure payload received but no decryption key is configured")]
    NoSecureKey,

    #[error("secure body has no payload")]
    MissingPayload,

    #[error("malformed change request: {0}")]
    Body(#[source] serde_json::Error),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl ProcessError {
    /// Left unacknowledged so the queue redelivers it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Blob(err) if err.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_blob_transport_failures_are_transient() {
        assert!(ProcessError::Blob(BlobError::Unavailable).is_transient());
        assert!(!ProcessError::Blob(BlobError::NotFound("k".into())).is_transient());
        assert!(!ProcessError::NoSecureKey.is_transient());
        assert!(!ProcessError::Resolver(ResolverError::UnknownModel("x".into())).is_transient());
    }

    #[test]
    fn resolver_message_passes_through() {
        let err = ProcessError::from(ResolverError::UnknownModel("spaceship".into()));
        assert_eq!(err.to_string(), "unknown model \"spaceship\"");
    }
}
