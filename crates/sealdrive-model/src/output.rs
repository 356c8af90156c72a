//! Response DTOs.
//!
//! [`FileResponse`] is the only view of a file that leaves the server; it
//! deliberately has no object-key fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealdrive_core::{EntityId, UserId};

use crate::file::File;
use crate::types::FileState;

/// Client-facing view of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File identifier.
    pub id: EntityId,
    /// The collection the file lives in.
    pub collection_id: EntityId,
    /// Owning user.
    pub owner_id: UserId,
    /// Opaque encrypted metadata blob.
    pub encrypted_metadata: String,
    /// Per-file key wrapped under the collection key.
    pub encrypted_file_key: String,
    /// Opaque encrypted content hash.
    pub encrypted_hash: String,
    /// Client-side encryption scheme marker.
    pub encryption_version: String,
    /// Ciphertext body size in bytes.
    pub encrypted_file_size_in_bytes: u64,
    /// Ciphertext thumbnail size in bytes, when one was declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_thumbnail_size_in_bytes: Option<u64>,
    /// Lifecycle state.
    pub state: FileState,
    /// Monotonic version counter.
    pub version: u64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last mutation instant.
    pub modified_at: DateTime<Utc>,
}

impl From<&File> for FileResponse {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            collection_id: file.collection_id,
            owner_id: file.owner_id,
            encrypted_metadata: file.encrypted_metadata.clone(),
            encrypted_file_key: file.encrypted_file_key.clone(),
            encrypted_hash: file.encrypted_hash.clone(),
            encryption_version: file.encryption_version.clone(),
            encrypted_file_size_in_bytes: file.encrypted_file_size_in_bytes,
            encrypted_thumbnail_size_in_bytes: file.encrypted_thumbnail_size_in_bytes,
            state: file.state,
            version: file.version,
            created_at: file.created_at,
            modified_at: file.modified_at,
        }
    }
}

/// Result of create-pending: the new file id and where to PUT the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePendingFileOutput {
    /// The allocated file identifier.
    pub file_id: EntityId,
    /// Presigned PUT URL for the ciphertext body.
    pub upload_url: String,
    /// Presigned PUT URL for the thumbnail, when one was declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_upload_url: Option<String>,
}

/// A short-lived download URL for a file's ciphertext body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedDownloadOutput {
    /// Presigned GET URL.
    pub url: String,
    /// Presigned GET URL for the thumbnail, when the file has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Per-id outcome of a bulk soft-delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyResult {
    /// The file the outcome refers to.
    pub id: EntityId,
    /// Whether the file was soft-deleted.
    pub deleted: bool,
    /// Failure description when `deleted` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a bulk soft-delete, one entry per requested id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyOutput {
    /// Outcomes in request order.
    pub results: Vec<DeleteManyResult>,
}
