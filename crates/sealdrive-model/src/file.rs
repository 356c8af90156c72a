//! File documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealdrive_core::{EntityId, UserId};

use crate::types::FileState;

/// A file's metadata document.
///
/// The ciphertext body lives in the object store under
/// `encrypted_file_object_key`; the metadata store carries only this record.
/// Object keys are server-controlled and never appear in client-facing
/// responses (see [`FileResponse`](crate::FileResponse)). Sizes are plaintext
/// byte counts kept for billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Globally unique identifier.
    pub id: EntityId,
    /// The collection this file lives in; immutable after creation.
    pub collection_id: EntityId,
    /// Owning user; equals the collection's owner at creation time.
    pub owner_id: UserId,
    /// Opaque encrypted metadata blob (name, mime type, client fields).
    pub encrypted_metadata: String,
    /// Per-file key wrapped under the collection key.
    pub encrypted_file_key: String,
    /// Opaque encrypted content hash.
    pub encrypted_hash: String,
    /// Client-side encryption scheme marker, opaque to the server.
    pub encryption_version: String,
    /// Object-store key of the ciphertext body.
    pub encrypted_file_object_key: String,
    /// Object-store key of the ciphertext thumbnail, when one was declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_thumbnail_object_key: Option<String>,
    /// Declared ciphertext body size in bytes.
    pub encrypted_file_size_in_bytes: u64,
    /// Declared ciphertext thumbnail size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_thumbnail_size_in_bytes: Option<u64>,
    /// Lifecycle state.
    pub state: FileState,
    /// Monotonic counter, bumped on every mutation.
    pub version: u64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last mutation instant.
    pub modified_at: DateTime<Utc>,
}

impl File {
    /// Whether this file declared a thumbnail at create time.
    #[must_use]
    pub fn has_thumbnail(&self) -> bool {
        self.encrypted_thumbnail_object_key.is_some()
    }
}
