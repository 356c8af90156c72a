//! File lifecycle operations.
//!
//! Uploads are three-step: create-pending persists metadata and hands back
//! presigned PUT URLs, the client uploads directly to the object store, and
//! complete-upload verifies the object actually landed (existence + size)
//! before flipping the file to `active` under the `complete:{fileId}` lock.
//! The server never trusts the client to have uploaded.

use chrono::Utc;
use tracing::debug;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{
    CreatePendingFileInput, CreatePendingFileOutput, DeleteManyInput, DeleteManyOutput,
    DeleteManyResult, File, FileState, PermissionLevel, PresignedDownloadOutput, UpdateFileInput,
};
use sealdrive_store::{FileStore, ObjectStore};

use crate::provider::SealDrive;

/// Object-store key for a file's ciphertext body.
pub(crate) fn object_key(owner: &UserId, file_id: &EntityId) -> String {
    format!("files/{}/{}", owner.to_hex(), file_id.to_hex())
}

/// Object-store key for a file's ciphertext thumbnail.
pub(crate) fn thumbnail_key(owner: &UserId, file_id: &EntityId) -> String {
    format!("{}.thumb", object_key(owner, file_id))
}

fn not_found(id: &EntityId) -> ServiceError {
    ServiceError::NotFound {
        entity: "file".to_owned(),
        id: id.to_string(),
    }
}

impl SealDrive {
    /// Step 1 of the upload: persist metadata in state `pending` and return
    /// presigned PUT URLs. No bytes have moved yet.
    ///
    /// The file's owner is the collection's owner, regardless of which
    /// member creates it.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::BadRequest`] on missing encrypted fields.
    /// - [`ServiceError::NotFound`] / [`ServiceError::Forbidden`] when the
    ///   collection is not writable by the caller.
    pub fn create_pending_file(
        &self,
        user: UserId,
        input: CreatePendingFileInput,
    ) -> ServiceResult<CreatePendingFileOutput> {
        for (value, field) in [
            (&input.encrypted_metadata, "encryptedMetadata"),
            (&input.encrypted_file_key, "encryptedFileKey"),
            (&input.encrypted_hash, "encryptedHash"),
        ] {
            if value.is_empty() {
                return Err(ServiceError::BadRequest {
                    field: field.to_owned(),
                    message: "required".to_owned(),
                });
            }
        }

        let collection =
            self.load_visible(&input.collection_id, &user, PermissionLevel::ReadWrite)?;

        let id = EntityId::generate();
        let owner = collection.owner_id;
        let body_key = object_key(&owner, &id);
        let thumb_key = input
            .encrypted_thumbnail_size_in_bytes
            .map(|_| thumbnail_key(&owner, &id));

        let now = Utc::now();
        let file = File {
            id,
            collection_id: collection.id,
            owner_id: owner,
            encrypted_metadata: input.encrypted_metadata,
            encrypted_file_key: input.encrypted_file_key,
            encrypted_hash: input.encrypted_hash,
            encryption_version: input.encryption_version,
            encrypted_file_object_key: body_key.clone(),
            encrypted_thumbnail_object_key: thumb_key.clone(),
            encrypted_file_size_in_bytes: input.encrypted_file_size_in_bytes,
            encrypted_thumbnail_size_in_bytes: input.encrypted_thumbnail_size_in_bytes,
            state: FileState::Pending,
            version: 1,
            created_at: now,
            modified_at: now,
        };
        self.files.insert(file)?;

        let ttl = self.config.presigned_upload_ttl();
        let output = CreatePendingFileOutput {
            file_id: id,
            upload_url: self.objects.presigned_upload_url(&body_key, ttl),
            thumbnail_upload_url: thumb_key
                .as_deref()
                .map(|key| self.objects.presigned_upload_url(key, ttl)),
        };

        debug!(file = %id, collection = %collection.id, "created pending file");
        Ok(output)
    }

    /// Step 3 of the upload: verify the object landed and flip the file to
    /// `active`.
    ///
    /// Runs under the `complete:{fileId}` lock. On verification failure the
    /// file stays `pending` and the call is retryable.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::ObjectMissing`] / [`ServiceError::ObjectSizeMismatch`]
    ///   when the object store does not hold what the client declared.
    /// - [`ServiceError::Conflict`] when the file is already `active`.
    /// - [`ServiceError::LockUnavailable`] when the lock stays contended.
    pub async fn complete_upload(&self, user: UserId, id: &EntityId) -> ServiceResult<File> {
        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        self.require_file_access(&file, &user, PermissionLevel::ReadWrite)?;

        let guard = self.locks.acquire(&format!("complete:{id}")).await?;
        let result = self.verify_and_activate(id).await;
        guard.release().await;
        result
    }

    /// Fetch a file's metadata.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] when absent or not readable.
    /// - [`ServiceError::Gone`] when deleted but readable.
    pub fn get_file(&self, user: UserId, id: &EntityId) -> ServiceResult<File> {
        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        self.require_file_access(&file, &user, PermissionLevel::ReadOnly)?;
        if file.state == FileState::Deleted {
            return Err(ServiceError::Gone {
                entity: "file".to_owned(),
                id: id.to_string(),
            });
        }
        Ok(file)
    }

    /// Replace a file's re-encrypted metadata fields. The collection, object
    /// keys, and sizes are not patchable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] when the patch carries no
    /// fields, [`ServiceError::Gone`] on deleted files.
    pub fn update_file(
        &self,
        user: UserId,
        id: &EntityId,
        input: UpdateFileInput,
    ) -> ServiceResult<File> {
        if input.encrypted_metadata.is_none()
            && input.encrypted_file_key.is_none()
            && input.encrypted_hash.is_none()
            && input.encryption_version.is_none()
        {
            return Err(ServiceError::BadRequest {
                field: "body".to_owned(),
                message: "no fields to update".to_owned(),
            });
        }

        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        self.require_file_access(&file, &user, PermissionLevel::ReadWrite)?;
        if file.state == FileState::Deleted {
            return Err(ServiceError::Gone {
                entity: "file".to_owned(),
                id: id.to_string(),
            });
        }

        let updated = self.files.update(id, |f| {
            if let Some(metadata) = input.encrypted_metadata {
                f.encrypted_metadata = metadata;
            }
            if let Some(key) = input.encrypted_file_key {
                f.encrypted_file_key = key;
            }
            if let Some(hash) = input.encrypted_hash {
                f.encrypted_hash = hash;
            }
            if let Some(version) = input.encryption_version {
                f.encryption_version = version;
            }
            f.version += 1;
            f.modified_at = Utc::now();
        })?;

        debug!(file = %id, version = updated.version, "updated file");
        Ok(updated)
    }

    /// Issue short-lived download URLs for a file's ciphertext (and
    /// thumbnail, when present). The object key itself is never exposed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] while the upload is still pending.
    pub fn presigned_download(
        &self,
        user: UserId,
        id: &EntityId,
    ) -> ServiceResult<PresignedDownloadOutput> {
        let file = self.get_file(user, id)?;
        if file.state == FileState::Pending {
            return Err(ServiceError::Conflict {
                message: format!("file {id} has no completed upload"),
            });
        }

        let ttl = self.config.presigned_download_ttl();
        Ok(PresignedDownloadOutput {
            url: self
                .objects
                .presigned_download_url(&file.encrypted_file_object_key, ttl),
            thumbnail_url: file
                .encrypted_thumbnail_object_key
                .as_deref()
                .map(|key| self.objects.presigned_download_url(key, ttl)),
        })
    }

    /// Archive an active file. The object is retained.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStateTransition`] when the file is not
    /// `active`.
    pub fn archive_file(&self, user: UserId, id: &EntityId) -> ServiceResult<File> {
        self.transition_file(user, id, FileState::Archived, PermissionLevel::ReadWrite)
    }

    /// Restore an archived file to `active`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStateTransition`] when the file is not
    /// `archived`.
    pub fn restore_file(&self, user: UserId, id: &EntityId) -> ServiceResult<File> {
        self.transition_file(user, id, FileState::Active, PermissionLevel::ReadWrite)
    }

    /// Soft-delete a file. The object is retained until hard-delete.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStateTransition`] when the file's
    /// state does not allow deletion (e.g. `archived`).
    pub fn soft_delete_file(&self, user: UserId, id: &EntityId) -> ServiceResult<File> {
        self.transition_file(user, id, FileState::Deleted, PermissionLevel::Admin)
    }

    /// Physically remove a file document and its objects.
    ///
    /// Owner-only, and only from state `deleted` or an expired `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] from any other state.
    pub async fn hard_delete_file(&self, user: UserId, id: &EntityId) -> ServiceResult<()> {
        let file = self
            .files
            .get_any_state(id)
            .filter(|f| f.owner_id == user)
            .ok_or_else(|| not_found(id))?;

        let expired_pending = file.state == FileState::Pending
            && file.created_at < Utc::now() - self.config.pending_ttl();
        if file.state != FileState::Deleted && !expired_pending {
            return Err(ServiceError::Conflict {
                message: format!("file {id} must be deleted or an expired pending upload"),
            });
        }

        self.objects.delete(&file.encrypted_file_object_key).await?;
        if let Some(thumb_key) = &file.encrypted_thumbnail_object_key {
            self.objects.delete(thumb_key).await?;
        }
        let _ = self.files.remove(id);

        debug!(file = %id, "hard-deleted file");
        Ok(())
    }

    /// Files in a readable collection. Defaults to excluding `deleted` and
    /// `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the collection is not
    /// readable.
    pub fn list_files_by_collection(
        &self,
        user: UserId,
        collection_id: &EntityId,
        states: Option<&[FileState]>,
    ) -> ServiceResult<Vec<File>> {
        self.load_visible(collection_id, &user, PermissionLevel::ReadOnly)?;
        Ok(self
            .files
            .find_by_collection(collection_id, states.unwrap_or(FileStore::VISIBLE)))
    }

    /// The caller's own files. Defaults to excluding `deleted` and
    /// `pending`.
    #[must_use]
    pub fn list_files_by_owner(
        &self,
        user: UserId,
        states: Option<&[FileState]>,
    ) -> Vec<File> {
        self.files
            .find_by_owner(&user, states.unwrap_or(FileStore::VISIBLE))
    }

    /// Bulk soft-delete. Validation runs per id; all permitted deletions are
    /// then applied in a single store pass, and failures are reported per
    /// id.
    #[must_use]
    pub fn delete_many_files(&self, user: UserId, input: DeleteManyInput) -> DeleteManyOutput {
        let mut results = Vec::with_capacity(input.ids.len());
        let mut to_delete = std::collections::HashSet::new();

        for id in &input.ids {
            let outcome = self.validate_soft_delete(&user, id);
            match outcome {
                Ok(already_deleted) => {
                    if !already_deleted {
                        to_delete.insert(*id);
                    }
                    results.push(DeleteManyResult {
                        id: *id,
                        deleted: true,
                        error: None,
                    });
                }
                Err(e) => results.push(DeleteManyResult {
                    id: *id,
                    deleted: false,
                    error: Some(e.to_string()),
                }),
            }
        }

        let now = Utc::now();
        let touched = self.files.update_many(
            |f| to_delete.contains(&f.id),
            |f| {
                f.state = FileState::Deleted;
                f.version += 1;
                f.modified_at = now;
            },
        );

        debug!(requested = input.ids.len(), deleted = touched, "bulk soft-delete");
        DeleteManyOutput { results }
    }

    /// Check one id for bulk deletion. `Ok(true)` means already deleted.
    fn validate_soft_delete(&self, user: &UserId, id: &EntityId) -> ServiceResult<bool> {
        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        self.require_file_access(&file, user, PermissionLevel::Admin)?;
        if file.state == FileState::Deleted {
            return Ok(true);
        }
        if !file.state.can_transition_to(FileState::Deleted) {
            return Err(ServiceError::InvalidStateTransition {
                from: file.state.to_string(),
                to: FileState::Deleted.to_string(),
            });
        }
        Ok(false)
    }

    /// Verification + activation body of complete-upload; runs under the
    /// per-file lock.
    pub(crate) async fn verify_and_activate(&self, id: &EntityId) -> ServiceResult<File> {
        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        match file.state {
            FileState::Pending => {}
            FileState::Active => {
                return Err(ServiceError::Conflict {
                    message: format!("file {id} is already active"),
                });
            }
            other => {
                return Err(ServiceError::InvalidStateTransition {
                    from: other.to_string(),
                    to: FileState::Active.to_string(),
                });
            }
        }

        self.verify_object(
            &file.encrypted_file_object_key,
            file.encrypted_file_size_in_bytes,
        )
        .await?;
        if let (Some(thumb_key), Some(thumb_size)) = (
            &file.encrypted_thumbnail_object_key,
            file.encrypted_thumbnail_size_in_bytes,
        ) {
            self.verify_object(thumb_key, thumb_size).await?;
        }

        let updated = self.files.update(id, |f| {
            f.state = FileState::Active;
            f.version += 1;
            f.modified_at = Utc::now();
        })?;

        debug!(file = %id, version = updated.version, "completed upload");
        Ok(updated)
    }

    /// Probe the object store for `key` and compare against the declared
    /// size.
    async fn verify_object(&self, key: &str, declared: u64) -> ServiceResult<()> {
        if !self.objects.exists(key).await? {
            return Err(ServiceError::ObjectMissing {
                key: key.to_owned(),
            });
        }
        let actual = self.objects.size(key).await?;
        if actual != declared {
            return Err(ServiceError::ObjectSizeMismatch {
                key: key.to_owned(),
                expected: declared,
                actual,
            });
        }
        Ok(())
    }

    /// Shared state-transition path for archive, restore, and soft-delete.
    fn transition_file(
        &self,
        user: UserId,
        id: &EntityId,
        target: FileState,
        required: PermissionLevel,
    ) -> ServiceResult<File> {
        let file = self.files.get_any_state(id).ok_or_else(|| not_found(id))?;
        self.require_file_access(&file, &user, required)?;

        if file.state == target {
            return Ok(file);
        }
        if !file.state.can_transition_to(target) {
            return Err(ServiceError::InvalidStateTransition {
                from: file.state.to_string(),
                to: target.to_string(),
            });
        }

        let updated = self.files.update(id, |f| {
            f.state = target;
            f.version += 1;
            f.modified_at = Utc::now();
        })?;
        debug!(file = %id, state = %target, "file state transition");
        Ok(updated)
    }
}
