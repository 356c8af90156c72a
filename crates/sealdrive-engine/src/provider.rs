//! The SealDrive provider.
//!
//! [`SealDrive`] owns all service state behind `Arc`s for cheap cloning and
//! shared ownership across request tasks. Operation handlers are implemented
//! in the per-engine submodules.

use std::sync::Arc;

use sealdrive_core::{LockService, MemoryKeyValueStore, ServiceConfig};
use sealdrive_store::{CollectionStore, FileStore, MemoryObjectStore, ObjectStore, UrlSigner};

/// The core service provider.
///
/// # Examples
///
/// ```
/// use sealdrive_core::ServiceConfig;
/// use sealdrive_engine::SealDrive;
///
/// let drive = SealDrive::new(ServiceConfig::default());
/// assert!(drive.collections().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SealDrive {
    /// Collection metadata documents.
    pub(crate) collections: Arc<CollectionStore>,
    /// File metadata documents.
    pub(crate) files: Arc<FileStore>,
    /// Ciphertext object store.
    pub(crate) objects: Arc<dyn ObjectStore>,
    /// Named distributed locks.
    pub(crate) locks: LockService,
    /// Service configuration.
    pub(crate) config: Arc<ServiceConfig>,
}

impl SealDrive {
    /// Create a provider with in-process backends built from `config`.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let signer = UrlSigner::new(
            config.presign_secret.as_bytes().to_vec(),
            config.object_store_base_url.clone(),
        );
        let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new(signer));
        let locks = LockService::from_config(Arc::new(MemoryKeyValueStore::new()), &config);
        Self::with_backends(
            config,
            Arc::new(CollectionStore::new()),
            Arc::new(FileStore::new()),
            objects,
            locks,
        )
    }

    /// Create a provider over caller-supplied backends.
    #[must_use]
    pub fn with_backends(
        config: ServiceConfig,
        collections: Arc<CollectionStore>,
        files: Arc<FileStore>,
        objects: Arc<dyn ObjectStore>,
        locks: LockService,
    ) -> Self {
        Self {
            collections,
            files,
            objects,
            locks,
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the collection store.
    #[must_use]
    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    /// Returns a reference to the file store.
    #[must_use]
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Returns a reference to the object store.
    #[must_use]
    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    /// Returns a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Reset all metadata state. Primarily useful for tests.
    pub fn reset(&self) {
        self.collections.reset();
        self.files.reset();
    }
}
