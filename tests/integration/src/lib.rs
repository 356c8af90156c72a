//! Integration tests for the SealDrive engine.
//!
//! These tests exercise the engine in-process: in-memory metadata and object
//! stores, the real lock service, and the full operation surface. Client
//! uploads are simulated by writing directly to the object store under the
//! key extracted from the presigned upload URL, exactly as the serving edge
//! would.

use std::collections::HashMap;

use bytes::Bytes;

use sealdrive_core::{EntityId, ServiceConfig, UserId};
use sealdrive_engine::SealDrive;
use sealdrive_model::{
    Collection, CreateCollectionInput, CreatePendingFileInput, CreatePendingFileOutput,
    PermissionLevel, ShareInput,
};
use sealdrive_store::ObjectStore;

/// A fresh engine over in-memory backends.
#[must_use]
pub fn test_drive() -> SealDrive {
    test_drive_with(ServiceConfig::default())
}

/// A fresh engine with a caller-tuned configuration.
#[must_use]
pub fn test_drive_with(config: ServiceConfig) -> SealDrive {
    SealDrive::new(config)
}

/// Create a root collection owned by `owner`.
pub fn create_root(drive: &SealDrive, owner: UserId, name: &str) -> Collection {
    drive
        .create_collection(
            owner,
            CreateCollectionInput {
                collection_type: sealdrive_model::CollectionType::Folder,
                encrypted_name: format!("enc:{name}"),
                encrypted_collection_key: format!("enc:key:{name}"),
                parent_id: None,
                encrypted_path_segments: vec![format!("enc:seg:{name}")],
            },
        )
        .unwrap_or_else(|e| panic!("create root {name} failed: {e}"))
}

/// Create a child collection under `parent`.
pub fn create_child(
    drive: &SealDrive,
    user: UserId,
    parent: &Collection,
    name: &str,
) -> Collection {
    let depth = parent.ancestor_ids.len() + 1;
    let mut segments: Vec<String> = (0..depth).map(|i| format!("enc:seg:{i}")).collect();
    segments.push(format!("enc:seg:{name}"));
    drive
        .create_collection(
            user,
            CreateCollectionInput {
                collection_type: sealdrive_model::CollectionType::Folder,
                encrypted_name: format!("enc:{name}"),
                encrypted_collection_key: format!("enc:key:{name}"),
                parent_id: Some(parent.id),
                encrypted_path_segments: segments,
            },
        )
        .unwrap_or_else(|e| panic!("create child {name} failed: {e}"))
}

/// Build a share input with one sealed key per collection in `subtree`.
#[must_use]
pub fn share_input(
    recipient: UserId,
    level: PermissionLevel,
    subtree: &[&Collection],
) -> ShareInput {
    let sealed_keys: HashMap<EntityId, String> = subtree
        .iter()
        .map(|c| (c.id, format!("sealed:{}", c.id)))
        .collect();
    ShareInput {
        recipient_id: recipient,
        recipient_email: "recipient@example.com".to_owned(),
        permission_level: level,
        sealed_keys,
    }
}

/// Build a create-pending input for `collection`.
#[must_use]
pub fn pending_input(
    collection: &Collection,
    size: u64,
    thumbnail_size: Option<u64>,
) -> CreatePendingFileInput {
    CreatePendingFileInput {
        collection_id: collection.id,
        encrypted_metadata: "enc:meta".to_owned(),
        encrypted_file_key: "enc:filekey".to_owned(),
        encrypted_hash: "enc:hash".to_owned(),
        encryption_version: "v1".to_owned(),
        encrypted_file_size_in_bytes: size,
        encrypted_thumbnail_size_in_bytes: thumbnail_size,
    }
}

/// Extract the object key from a presigned URL (the path below the base).
#[must_use]
pub fn key_from_url(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let marker = "/objects/";
    let start = path
        .find(marker)
        .unwrap_or_else(|| panic!("presigned URL {url} not under the object base"));
    path[start + marker.len()..].to_owned()
}

/// Simulate the client's presigned PUT of the ciphertext body.
pub async fn upload_body(drive: &SealDrive, output: &CreatePendingFileOutput, data: &[u8]) {
    let key = key_from_url(&output.upload_url);
    drive
        .objects()
        .put(&key, Bytes::copy_from_slice(data))
        .await
        .unwrap_or_else(|e| panic!("simulated upload failed: {e}"));
}

/// Simulate the client's presigned PUT of the thumbnail.
pub async fn upload_thumbnail(drive: &SealDrive, output: &CreatePendingFileOutput, data: &[u8]) {
    let url = output
        .thumbnail_upload_url
        .as_ref()
        .expect("file declared a thumbnail");
    let key = key_from_url(url);
    drive
        .objects()
        .put(&key, Bytes::copy_from_slice(data))
        .await
        .unwrap_or_else(|e| panic!("simulated thumbnail upload failed: {e}"));
}

mod test_files;
mod test_membership;
mod test_sync;
