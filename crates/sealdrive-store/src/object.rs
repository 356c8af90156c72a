//! Object store abstraction for ciphertext bodies.
//!
//! The core never streams object bytes through itself: clients upload and
//! download directly against presigned URLs, and the engines only probe for
//! existence and size. Keys are server-controlled
//! (`files/{owner_hex}/{file_id_hex}` plus a `.thumb` sibling) and never
//! surface to clients.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, trace};

use sealdrive_core::{ServiceError, ServiceResult};

use crate::presign::UrlSigner;

/// Seam to the object store holding ciphertext bodies.
///
/// Implementations must be idempotent on [`delete`](Self::delete) and atomic
/// on [`put`](Self::put).
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Store `data` under `key`, replacing any previous object.
    async fn put(&self, key: &str, data: Bytes) -> ServiceResult<()>;

    /// Fetch the object at `key`.
    ///
    /// Fails with [`ServiceError::ObjectMissing`] when absent.
    async fn get(&self, key: &str) -> ServiceResult<Bytes>;

    /// Delete the object at `key`. A no-op when absent.
    async fn delete(&self, key: &str) -> ServiceResult<()>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> ServiceResult<bool>;

    /// Size in bytes of the object at `key`.
    ///
    /// Fails with [`ServiceError::ObjectMissing`] when absent.
    async fn size(&self, key: &str) -> ServiceResult<u64>;

    /// Issue a time-limited upload URL for `key`.
    fn presigned_upload_url(&self, key: &str, ttl: chrono::Duration) -> String;

    /// Issue a time-limited download URL for `key`.
    fn presigned_download_url(&self, key: &str, ttl: chrono::Duration) -> String;
}

/// In-memory [`ObjectStore`] for single-node deployments and tests.
pub struct MemoryObjectStore {
    objects: DashMap<String, Bytes>,
    signer: UrlSigner,
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("objects_count", &self.objects.len())
            .finish_non_exhaustive()
    }
}

impl MemoryObjectStore {
    /// Create an empty store issuing presigned URLs through `signer`.
    #[must_use]
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: DashMap::new(),
            signer,
        }
    }

    /// Drop every object.
    pub fn reset(&self) {
        self.objects.clear();
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> ServiceResult<()> {
        trace!(key, size = data.len(), "stored object");
        self.objects.insert(key.to_owned(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> ServiceResult<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| ServiceError::ObjectMissing {
                key: key.to_owned(),
            })
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        if self.objects.remove(key).is_some() {
            debug!(key, "deleted object");
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> ServiceResult<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn size(&self, key: &str) -> ServiceResult<u64> {
        self.objects
            .get(key)
            .map(|entry| entry.len() as u64)
            .ok_or_else(|| ServiceError::ObjectMissing {
                key: key.to_owned(),
            })
    }

    fn presigned_upload_url(&self, key: &str, ttl: chrono::Duration) -> String {
        self.signer.presign("PUT", key, ttl)
    }

    fn presigned_download_url(&self, key: &str, ttl: chrono::Duration) -> String {
        self.signer.presign("GET", key, ttl)
    }
}
