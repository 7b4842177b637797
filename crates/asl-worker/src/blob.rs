//! # Blob Store
//!
//! Change-request bodies live in an object store; queue messages only carry
//! their key. [`HttpBlobStore`] resolves a key against a base URL,
//! [`MemoryBlobStore`] backs tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

/// Errors from fetching a blob.
#[derive(Error, Debug)]
pub enum BlobError {
    /// The request never produced a response.
    #[error("blob transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The object store answered with a non-success status.
    #[error("blob {key} returned HTTP {status}")]
    Status { key: String, status: u16 },

    /// No object exists under the key.
    #[error("blob {0} not found")]
    NotFound(String),

    /// The key does not form a valid object URL.
    #[error("invalid blob key {key}: {source}")]
    Key {
        key: String,
        #[source]
        source: url::ParseError,
    },

    /// The store is temporarily unreachable.
    #[error("blob store unavailable")]
    Unavailable,
}

impl BlobError {
    /// Whether a later redelivery could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Unavailable => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::Key { .. } => false,
        }
    }
}

/// Read access to message bodies.
pub trait BlobStore: Send + Sync {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Vec<u8>, BlobError>> + Send;
}

// ─── HTTP ────────────────────────────────────────────────────────────

/// Objects served over HTTP at `base_url + key`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBlobStore {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    /// The URL a key resolves to.
    pub fn object_url(&self, key: &str) -> Result<Url, BlobError> {
        self.base_url
            .join(key.trim_start_matches('/'))
            .map_err(|source| BlobError::Key {
                key: key.to_string(),
                source,
            })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl BlobStore for HttpBlobStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let url = self.object_url(key)?;
        tracing::debug!(%url, "fetching change request body");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(BlobError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

// ─── In-memory ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Objects {
    by_key: HashMap<String, Vec<u8>>,
    unavailable: bool,
}

/// Process-local blob store for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<Objects>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.write().await.by_key.insert(key.into(), bytes.into());
    }

    /// Make every fetch fail with [`BlobError::Unavailable`] until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.objects.write().await.unavailable = unavailable;
    }
}

impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let objects = self.objects.read().await;
        if objects.unavailable {
            return Err(BlobError::Unavailable);
        }
        objects
            .by_key
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_appends_key_to_base_path() {
        let store = HttpBlobStore::new(Url::parse("https://blobs.example.test/bucket").unwrap(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.object_url("/requests/abc.json").unwrap().as_str(),
            "https://blobs.example.test/bucket/requests/abc.json"
        );
        assert_eq!(
            store.object_url("abc").unwrap().as_str(),
            "https://blobs.example.test/bucket/abc"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(BlobError::Unavailable.is_transient());
        assert!(BlobError::Status { key: "k".into(), status: 503 }.is_transient());
        assert!(BlobError::Status { key: "k".into(), status: 429 }.is_transient());
        assert!(!BlobError::Status { key: "k".into(), status: 403 }.is_transient());
        assert!(!BlobError::NotFound("k".into()).is_transient());
    }

    #[tokio::test]
    async fn memory_store_serves_and_misses() {
        let store = MemoryBlobStore::new();
        store.put("a", b"body".to_vec()).await;
        assert_eq!(store.fetch("a").await.unwrap(), b"body");
        assert!(matches!(store.fetch("b").await, Err(BlobError::NotFound(_))));

        store.set_unavailable(true).await;
        assert!(matches!(store.fetch("a").await, Err(BlobError::Unavailable)));
    }
}
