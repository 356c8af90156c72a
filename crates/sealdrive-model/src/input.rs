//! Request DTOs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sealdrive_core::{EntityId, UserId};

use crate::types::{CollectionType, PermissionLevel};

/// Create a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionInput {
    /// Folder or album.
    #[serde(rename = "type", default)]
    pub collection_type: CollectionType,
    /// Opaque encrypted display name.
    pub encrypted_name: String,
    /// The collection key wrapped under the owner's master key.
    pub encrypted_collection_key: String,
    /// Parent collection; absent to create a root.
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    /// Opaque display segments, one per ancestor plus self.
    pub encrypted_path_segments: Vec<String>,
}

/// Replace a collection's encrypted fields.
///
/// Ownership and placement never change here; placement goes through move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionInput {
    /// New encrypted display name, when re-encrypted.
    #[serde(default)]
    pub encrypted_name: Option<String>,
    /// New wrapped collection key, when re-wrapped.
    #[serde(default)]
    pub encrypted_collection_key: Option<String>,
}

/// Move a collection (and its subtree) under a new parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCollectionInput {
    /// The new parent; absent to move to root.
    #[serde(default)]
    pub new_parent_id: Option<EntityId>,
    /// Re-encrypted display segments for the new ancestor chain, root first,
    /// ending with the new parent's segment. Empty when moving to root.
    #[serde(default)]
    pub encrypted_path_prefix: Vec<String>,
}

/// Share a collection hierarchy with a recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInput {
    /// The user to grant access to.
    pub recipient_id: UserId,
    /// The recipient's email.
    pub recipient_email: String,
    /// Permission level for the grant and its inherited copies.
    pub permission_level: PermissionLevel,
    /// Collection key sealed to the recipient's public key, per collection in
    /// the subtree (the shared collection itself included). The caller holds
    /// the ancestor chain's keys and must supply one per descendant that
    /// needs an inherited copy.
    pub sealed_keys: HashMap<EntityId, String>,
}

/// Change a direct membership's permission level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPermissionInput {
    /// The new level, propagated to inherited copies.
    pub permission_level: PermissionLevel,
}

/// Step 1 of the three-step upload: persist metadata, get upload URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePendingFileInput {
    /// The collection to create the file in.
    pub collection_id: EntityId,
    /// Opaque encrypted metadata blob.
    pub encrypted_metadata: String,
    /// Per-file key wrapped under the collection key.
    pub encrypted_file_key: String,
    /// Opaque encrypted content hash.
    pub encrypted_hash: String,
    /// Client-side encryption scheme marker.
    pub encryption_version: String,
    /// Expected ciphertext body size in bytes.
    pub encrypted_file_size_in_bytes: u64,
    /// Expected ciphertext thumbnail size in bytes, when uploading one.
    #[serde(default)]
    pub encrypted_thumbnail_size_in_bytes: Option<u64>,
}

/// Replace a file's re-encrypted metadata fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileInput {
    /// New encrypted metadata blob.
    #[serde(default)]
    pub encrypted_metadata: Option<String>,
    /// New wrapped per-file key.
    #[serde(default)]
    pub encrypted_file_key: Option<String>,
    /// New encrypted content hash.
    #[serde(default)]
    pub encrypted_hash: Option<String>,
    /// New encryption scheme marker.
    #[serde(default)]
    pub encryption_version: Option<String>,
}

/// Bulk soft-delete of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyInput {
    /// Files to soft-delete.
    pub ids: Vec<EntityId>,
}
